//! Deadline registry: the single source of truth for which items are tracked
//! and when they expire.
//!
//! # Invariants
//! - One entry per item id; the latest write wins.
//! - Deadlines are absolute milliseconds, never durations.
//! - `snapshot_keys` is a copy, so callers may mutate while iterating it.

use dashmap::DashMap;
use despawnrate_common::EntityId;

#[derive(Debug, Default)]
pub struct DeadlineRegistry {
    deadlines: DashMap<EntityId, u64>,
}

impl DeadlineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the deadline for `id`. Returns the previous one.
    pub fn put(&self, id: EntityId, deadline: u64) -> Option<u64> {
        self.deadlines.insert(id, deadline)
    }

    pub fn get(&self, id: EntityId) -> Option<u64> {
        self.deadlines.get(&id).map(|d| *d)
    }

    pub fn remove(&self, id: EntityId) -> Option<u64> {
        self.deadlines.remove(&id).map(|(_, d)| d)
    }

    /// Remove `id` only if its deadline is at or before `now`.
    ///
    /// The check and the removal happen under the same shard lock, so a
    /// deadline pushed into the future by a concurrent re-track survives.
    pub fn remove_if_due(&self, id: EntityId, now: u64) -> Option<u64> {
        self.deadlines
            .remove_if(&id, |_, deadline| *deadline <= now)
            .map(|(_, d)| d)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.deadlines.contains_key(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn clear(&self) {
        self.deadlines.clear();
    }

    /// Point-in-time copy of every tracked id.
    pub fn snapshot_keys(&self) -> Vec<EntityId> {
        self.deadlines.iter().map(|e| *e.key()).collect()
    }

    /// Earliest deadline currently tracked.
    pub fn next_deadline(&self) -> Option<u64> {
        self.deadlines.iter().map(|e| *e.value()).min()
    }
}
