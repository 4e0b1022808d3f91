use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use despawnrate_core::{
    Clock, CommandSender, ConfigSource, DEFAULT_CONFIG, FileConfigSource, RuleSet,
    StaticConfigSource, SystemClock,
};
use despawnrate_kernel::{KindCatalog, Simulation};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "despawnrate", about = "Per-kind item despawn timers")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version information
    Info,
    /// Write the default config file if it does not exist
    Init {
        #[arg(short, long, default_value = "config.yml")]
        config: PathBuf,
    },
    /// Load a config and show which rules it produces
    Rules {
        #[arg(short, long, default_value = "config.yml")]
        config: PathBuf,
    },
    /// Run a simulated server with the given items and report as they despawn
    Simulate {
        /// Config file; the built-in default is used if it does not exist
        #[arg(short, long, default_value = "config.yml")]
        config: PathBuf,
        /// Seconds of simulated time
        #[arg(short, long, default_value = "60")]
        seconds: u64,
        /// Items to spawn, as kind=count (repeatable)
        #[arg(long = "spawn", value_name = "KIND=COUNT")]
        spawns: Vec<String>,
        /// Turn on per-item debug logging through the command surface
        #[arg(long)]
        debug: bool,
        /// Print status lines as JSON
        #[arg(long)]
        json: bool,
    },
}

struct Console;

impl CommandSender for Console {
    fn name(&self) -> &str {
        "console"
    }

    fn send_message(&self, message: &str) {
        println!("{message}");
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("despawnrate v{}", env!("CARGO_PKG_VERSION"));
            println!("known kinds: {}", KindCatalog::standard().len());
        }
        Commands::Init { config } => {
            let source = FileConfigSource::new(&config);
            if source.save_default()? {
                println!("wrote {}", config.display());
            } else {
                println!("{} already exists", config.display());
            }
        }
        Commands::Rules { config } => {
            let source = FileConfigSource::new(&config);
            let loaded = source
                .load()
                .with_context(|| format!("loading {}", config.display()))?;
            let catalog = KindCatalog::standard();
            let Some(items) = loaded.items.as_ref() else {
                println!("no 'items' section in {}", config.display());
                return Ok(());
            };
            let (rules, skipped) = RuleSet::parse(items, &catalog);
            for (kind, seconds) in rules.iter() {
                println!("{kind} = {seconds}s");
            }
            for err in &skipped {
                println!("skipped: {err}");
            }
            println!(
                "{} rule(s), {} skipped, sweep every {} ticks, merge fallback {}s",
                rules.len(),
                skipped.len(),
                loaded.settings.sweep_interval_ticks,
                loaded.settings.merge_fallback_seconds
            );
        }
        Commands::Simulate {
            config,
            seconds,
            spawns,
            debug,
            json,
        } => {
            let source: Arc<dyn ConfigSource> = if config.exists() {
                Arc::new(FileConfigSource::new(&config))
            } else {
                tracing::info!(path = %config.display(), "config not found, using defaults");
                Arc::new(StaticConfigSource::from_yaml(DEFAULT_CONFIG)?)
            };
            let sim = Simulation::start(source, &["overworld"], SystemClock.now_millis());
            if debug {
                sim.service.on_command(&Console, "despawnrate", &["debug"]);
            }

            for spec in &spawns {
                let (kind, count) = parse_spawn(spec)?;
                for _ in 0..count {
                    sim.server
                        .spawn_item("overworld", kind, 1)
                        .with_context(|| format!("spawning {kind}"))?;
                }
            }

            for second in 1..=seconds {
                sim.run_seconds(1);
                let status = sim.service.status();
                if json {
                    println!("{}", serde_json::to_string(&status)?);
                } else {
                    println!(
                        "t={second}s items={} tracked={} scanner={}",
                        sim.server.item_count(),
                        status.tracked,
                        if status.scanner_active { "active" } else { "idle" }
                    );
                }
            }
            println!("{}", sim.service.status());
            sim.shutdown();
        }
    }

    Ok(())
}

fn parse_spawn(spec: &str) -> anyhow::Result<(&str, u32)> {
    match spec.split_once('=') {
        Some((kind, count)) => {
            let count = count
                .trim()
                .parse()
                .with_context(|| format!("bad count in {spec:?}"))?;
            Ok((kind.trim(), count))
        }
        None => Ok((spec.trim(), 1)),
    }
}
