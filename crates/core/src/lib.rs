//! Despawn deadlines for transient world items.
//!
//! Items become tracked when they appear in the world and their kind has a
//! configured duration. A periodic sweep, started lazily on the first tracked
//! item and stopped once nothing is tracked, removes items whose deadline has
//! passed and forgets items that disappeared on their own.
//!
//! # Invariants
//! - The deadline registry is the single source of truth for what is tracked.
//! - The sweep task is never running while the registry is empty at the end
//!   of a pass, and never absent while entries are pending.
//! - No failure in this crate is fatal to the host: bad config entries are
//!   skipped, missing items pruned, failed removals logged.

pub mod command;
pub mod config;
pub mod host;
pub mod lifecycle;
pub mod registry;
pub mod rules;
pub mod service;
pub mod status;
pub mod sweep;
pub mod tracking;

#[cfg(test)]
mod testing;

pub use config::{
    ConfigError, ConfigSource, DEFAULT_CONFIG, DespawnConfig, FileConfigSource, Settings,
    StaticConfigSource,
};
pub use host::{
    Clock, CommandSender, HostError, ItemHost, ItemView, KindResolver, ManualClock, OnceTask,
    RepeatingTask, SystemClock, TaskScheduler,
};
pub use lifecycle::{LifecycleEvent, Picker};
pub use registry::DeadlineRegistry;
pub use rules::{RuleError, RuleSet};
pub use service::DespawnService;
pub use status::StatusReport;
pub use sweep::{ScannerState, SweepReport};
