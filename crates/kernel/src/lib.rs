//! Reference host: worlds full of items, a cooperative tick scheduler, and
//! lifecycle event delivery.
//!
//! # Invariants
//! - All item mutations go through explicit world operations and produce events.
//! - Events and scheduled tasks are processed on the tick loop, one at a time.

pub mod catalog;
pub mod scheduler;
pub mod server;
pub mod sim;
pub mod world;

pub use catalog::KindCatalog;
pub use scheduler::{TickClock, TickScheduler};
pub use server::{Listener, Server, ServerError};
pub use sim::Simulation;
pub use world::{ItemData, World, WorldEvent};
