//! Bootstrap that wires a [`DespawnService`] into a [`Server`].

use std::sync::Arc;

use despawnrate_common::seconds_to_ticks;
use despawnrate_core::{ConfigSource, DespawnService, LifecycleEvent};

use crate::catalog::KindCatalog;
use crate::scheduler::{TickClock, TickScheduler};
use crate::server::Server;

pub struct Simulation {
    pub server: Arc<Server>,
    pub service: Arc<DespawnService>,
}

impl Simulation {
    /// Build a server with the given worlds, subscribe the service to its
    /// events, and enable it.
    pub fn start(config: Arc<dyn ConfigSource>, worlds: &[&str], epoch_millis: u64) -> Self {
        let scheduler = Arc::new(TickScheduler::new());
        let server = Arc::new(Server::new(KindCatalog::standard(), Arc::clone(&scheduler)));
        for name in worlds {
            server.add_world(*name);
        }
        let clock = Arc::new(TickClock::new(Arc::clone(&scheduler), epoch_millis));
        let service = DespawnService::new(server.clone(), scheduler, clock, config);

        let subscriber = Arc::downgrade(&service);
        server.subscribe(Arc::new(move |event: LifecycleEvent| {
            if let Some(service) = subscriber.upgrade() {
                service.on_event(event);
            }
        }));
        service.enable();
        tracing::info!(worlds = worlds.len(), "simulation started");

        Self { server, service }
    }

    pub fn tick(&self) {
        self.server.tick();
    }

    pub fn run_seconds(&self, seconds: u64) {
        self.server.run_ticks(seconds_to_ticks(seconds));
    }

    pub fn shutdown(&self) {
        self.service.disable();
    }
}
