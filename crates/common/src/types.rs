use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Length of one host scheduling quantum in milliseconds.
pub const MILLIS_PER_TICK: u64 = 50;

/// Host ticks per second of wall time.
pub const TICKS_PER_SECOND: u64 = 1000 / MILLIS_PER_TICK;

/// Namespace assumed for kind names written without one.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

/// Unique identifier for an item entity in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier for an actor (an agent able to pick items up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub Uuid);

impl ActorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for a task submitted to the host scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

/// Returned when a kind name cannot be normalized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed item kind name: {0:?}")]
pub struct KindParseError(pub String);

/// Normalized item kind key, always `namespace:path` in lowercase.
///
/// `"DIRT"`, `"dirt"` and `"minecraft:dirt"` all normalize to the same kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemKind(String);

impl ItemKind {
    pub fn parse(name: &str) -> Result<Self, KindParseError> {
        let trimmed = name.trim();
        let lowered = trimmed.to_ascii_lowercase();
        let (namespace, path) = match lowered.split_once(':') {
            Some((ns, path)) => (ns, path),
            None => (DEFAULT_NAMESPACE, lowered.as_str()),
        };
        let valid_part = |s: &str| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "_./-".contains(c))
        };
        if !valid_part(namespace) || !valid_part(path) {
            return Err(KindParseError(name.to_owned()));
        }
        Ok(Self(format!("{namespace}:{path}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part after the namespace separator.
    pub fn path(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(_, p)| p)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ItemKind {
    type Error = KindParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ItemKind> for String {
    fn from(kind: ItemKind) -> Self {
        kind.0
    }
}

/// Convert whole seconds into host ticks.
pub fn seconds_to_ticks(seconds: u64) -> u64 {
    seconds * TICKS_PER_SECOND
}
