//! Host lifecycle notifications and the merge deadline policy.

use despawnrate_common::{ActorId, EntityId};

/// Who picked an item up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Picker {
    /// An actor; picking up ends tracking.
    Actor(ActorId),
    /// Anything else (hoppers, mobs, transport). Tracking is left alone.
    Other,
}

/// Notifications delivered on the host's task queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Spawned { item: EntityId },
    Dropped { item: EntityId, actor: ActorId },
    PickedUp { item: EntityId, picker: Picker },
    /// `source` vanished into `target`.
    Merged { source: EntityId, target: EntityId },
}

/// Deadline for the surviving stack of a merge.
///
/// The more urgent deadline wins so merging can never extend an item's life.
/// When neither side was tracked the result is `now + fallback_ms`.
pub fn merge_deadline(
    source: Option<u64>,
    target: Option<u64>,
    now: u64,
    fallback_ms: u64,
) -> u64 {
    match (source, target) {
        (Some(s), Some(t)) => s.min(t),
        (Some(d), None) | (None, Some(d)) => d,
        (None, None) => now.saturating_add(fallback_ms),
    }
}
