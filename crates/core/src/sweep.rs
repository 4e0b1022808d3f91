//! Sweep scheduler: a lazily started periodic pass over the deadline registry.
//!
//! # Invariants
//! - The periodic task runs iff the registry had entries at the last check.
//! - Start and stop are serialized by one mutex; stopping re-checks emptiness
//!   under that mutex, so an insertion racing the end of a sweep either keeps
//!   the task alive or finds it idle and restarts it.

use despawnrate_common::TaskId;
use parking_lot::Mutex;
use serde::Serialize;

use crate::host::ItemHost;
use crate::registry::DeadlineRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerState {
    Idle,
    Active(TaskId),
}

/// Counters from one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    /// Entries whose deadline had passed.
    pub expired: usize,
    /// Expired items the host removed.
    pub removed: usize,
    /// Expired items the host refused to remove.
    pub failed: usize,
    /// Not-yet-due entries whose item could no longer be found.
    pub pruned: usize,
}

/// Idle/Active state machine guarding the periodic task handle.
#[derive(Debug)]
pub struct Scanner {
    state: Mutex<ScannerState>,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ScannerState::Idle),
        }
    }

    pub fn state(&self) -> ScannerState {
        *self.state.lock()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state(), ScannerState::Active(_))
    }

    /// Idle -> Active when there is work. `start` launches the periodic task
    /// and is called at most once. Returns whether a task was started.
    pub fn ensure_running(
        &self,
        registry: &DeadlineRegistry,
        start: impl FnOnce() -> TaskId,
    ) -> bool {
        let mut state = self.state.lock();
        if *state != ScannerState::Idle || registry.is_empty() {
            return false;
        }
        *state = ScannerState::Active(start());
        true
    }

    /// Active -> Idle if the registry is empty. Returns whether it stopped.
    pub fn stop_if_idle(&self, registry: &DeadlineRegistry, cancel: impl FnOnce(TaskId)) -> bool {
        let mut state = self.state.lock();
        match *state {
            ScannerState::Active(id) if registry.is_empty() => {
                cancel(id);
                *state = ScannerState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Active -> Idle regardless of pending work. Used on shutdown and reload.
    pub fn force_stop(&self, cancel: impl FnOnce(TaskId)) -> bool {
        let mut state = self.state.lock();
        match *state {
            ScannerState::Active(id) => {
                cancel(id);
                *state = ScannerState::Idle;
                true
            }
            ScannerState::Idle => false,
        }
    }
}

/// One pass over every tracked id.
///
/// Due entries are removed and their item removed from the host; entries that
/// are not yet due but whose item can no longer be found are pruned. A failed
/// removal is logged and does not stop the pass.
pub fn sweep_pass<H: ItemHost + ?Sized>(
    registry: &DeadlineRegistry,
    host: &H,
    now: u64,
    verbose: bool,
) -> SweepReport {
    let _span = tracing::debug_span!("sweep", tracked = registry.len()).entered();
    let mut report = SweepReport::default();

    for id in registry.snapshot_keys() {
        report.scanned += 1;
        let Some(deadline) = registry.get(id) else {
            continue;
        };

        if deadline <= now {
            if registry.remove_if_due(id, now).is_none() {
                // re-tracked since the read
                continue;
            }
            report.expired += 1;
            match host.lookup(id) {
                Some(item) if item.valid => match host.remove(id) {
                    Ok(()) => {
                        report.removed += 1;
                        if verbose {
                            tracing::info!(%id, kind = %item.kind, "removing expired item");
                        }
                    }
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(%id, error = %e, "failed removing expired item");
                    }
                },
                _ => {
                    if verbose {
                        tracing::debug!(%id, "expired tracked id not present");
                    }
                }
            }
        } else if host.lookup(id).is_none() {
            registry.remove(id);
            report.pruned += 1;
            if verbose {
                tracing::debug!(%id, "tracked entity gone, removed");
            }
        }
    }

    tracing::debug!(
        scanned = report.scanned,
        expired = report.expired,
        removed = report.removed,
        failed = report.failed,
        pruned = report.pruned,
        remaining = registry.len(),
        "sweep complete"
    );
    report
}
