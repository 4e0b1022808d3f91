//! Capabilities consumed from the host environment.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use despawnrate_common::{EntityId, ItemKind, TaskId};

/// Point-in-time view of a live item as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub id: EntityId,
    pub kind: ItemKind,
    /// False once the item is dead or otherwise in a terminal state.
    pub valid: bool,
}

/// Errors a host may report when asked to remove an item.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("removal rejected: {0}")]
    Rejected(String),
    #[error("host unavailable")]
    Unavailable,
}

/// Maps configured kind names onto kinds the host knows about.
pub trait KindResolver {
    fn resolve_kind(&self, name: &str) -> Option<ItemKind>;
}

/// The host's item model.
///
/// `lookup` may be expensive (it can scan every world); callers should treat
/// `None` as "already gone" rather than as an error.
pub trait ItemHost: KindResolver + Send + Sync {
    fn lookup(&self, id: EntityId) -> Option<ItemView>;

    /// Every live item across all worlds.
    fn live_items(&self) -> Vec<ItemView>;

    /// Remove an item. Removing an item that is already gone is a no-op.
    fn remove(&self, id: EntityId) -> Result<(), HostError>;
}

pub type OnceTask = Box<dyn FnOnce() + Send>;
pub type RepeatingTask = Box<dyn FnMut() + Send>;

/// The host's cooperative task queue. Delays and periods are in ticks.
///
/// A task never runs before the `schedule_*` call that submitted it returns.
pub trait TaskScheduler: Send + Sync {
    fn schedule_once(&self, delay_ticks: u64, task: OnceTask) -> TaskId;

    fn schedule_repeating(&self, delay_ticks: u64, period_ticks: u64, task: RepeatingTask)
    -> TaskId;

    /// Cancelling an unknown or finished task is a no-op.
    fn cancel(&self, id: TaskId);
}

/// Millisecond wall clock.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(start_millis),
        }
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Whoever issued a command; replies are delivered through it.
pub trait CommandSender {
    fn name(&self) -> &str;
    fn send_message(&self, message: &str);
}
