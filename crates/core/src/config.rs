//! YAML configuration: per-kind despawn durations plus scheduler settings.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Written by [`FileConfigSource::save_default`] when no config exists yet.
pub const DEFAULT_CONFIG: &str = "\
# Seconds an item of the given kind may lie in the world before it is removed.
# Kind names are case-insensitive; the minecraft: namespace is implied.
items:
  rotten_flesh: 30
  cobblestone: 60
  dirt: 60

settings:
  # How often tracked items are checked, in ticks (20 ticks = 1 second).
  sweep-interval-ticks: 20
  # Deadline given to a merged stack when neither half was tracked.
  merge-fallback-seconds: 300
  debug: false
";

/// Errors from loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DespawnConfig {
    /// Raw `kind -> seconds` entries. Values are validated by the rule table,
    /// not here, so one bad entry cannot fail the whole file.
    #[serde(default)]
    pub items: Option<serde_yaml::Mapping>,
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    pub sweep_interval_ticks: u64,
    pub merge_fallback_seconds: u64,
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sweep_interval_ticks: 20,
            merge_fallback_seconds: 300,
            debug: false,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval_ticks == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "sweep-interval-ticks",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn merge_fallback_millis(&self) -> u64 {
        self.merge_fallback_seconds.saturating_mul(1000)
    }
}

impl DespawnConfig {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(text)?;
        config.settings.validate()?;
        Ok(config)
    }
}

/// Something the service can (re)read its configuration from.
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> Result<DespawnConfig, ConfigError>;
}

/// Reads `config.yml`-style files from disk on every load.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write [`DEFAULT_CONFIG`] if the file does not exist. Returns whether
    /// anything was written.
    pub fn save_default(&self) -> Result<bool, ConfigError> {
        if self.path.exists() {
            return Ok(false);
        }
        let io_err = |source| ConfigError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        std::fs::write(&self.path, DEFAULT_CONFIG).map_err(io_err)?;
        tracing::info!(path = %self.path.display(), "wrote default config");
        Ok(true)
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self) -> Result<DespawnConfig, ConfigError> {
        let text = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        DespawnConfig::from_yaml(&text)
    }
}

/// In-memory config, replaceable at runtime. Used when embedding and in tests.
#[derive(Debug, Default)]
pub struct StaticConfigSource {
    config: RwLock<DespawnConfig>,
}

impl StaticConfigSource {
    pub fn new(config: DespawnConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(DespawnConfig::from_yaml(text)?))
    }

    pub fn replace(&self, config: DespawnConfig) {
        *self.config.write() = config;
    }
}

impl ConfigSource for StaticConfigSource {
    fn load(&self) -> Result<DespawnConfig, ConfigError> {
        Ok(self.config.read().clone())
    }
}
