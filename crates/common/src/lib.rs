//! Shared identifiers, item kinds and tick constants.

mod types;

pub use types::{
    ActorId, DEFAULT_NAMESPACE, EntityId, ItemKind, KindParseError, MILLIS_PER_TICK,
    TICKS_PER_SECOND, TaskId, seconds_to_ticks,
};
