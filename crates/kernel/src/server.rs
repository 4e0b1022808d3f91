//! The server: every loaded world, the tick scheduler, and event delivery.

use std::collections::BTreeMap;
use std::sync::Arc;

use despawnrate_common::{ActorId, EntityId, ItemKind};
use despawnrate_core::{
    HostError, ItemHost, ItemView, KindResolver, LifecycleEvent, Picker,
};
use parking_lot::{Mutex, RwLock};

use crate::catalog::KindCatalog;
use crate::scheduler::TickScheduler;
use crate::world::{World, WorldEvent};

/// Errors from server-side item operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("no world named {0:?}")]
    UnknownWorld(String),
    #[error("unknown item kind {0:?}")]
    UnknownKind(String),
    #[error("item {0} not found")]
    ItemNotFound(EntityId),
}

pub type Listener = Arc<dyn Fn(LifecycleEvent) + Send + Sync>;

/// Multi-world item host.
///
/// Event delivery and task execution never happen while the world lock is
/// held, so subscribers may call back into the server freely.
pub struct Server {
    worlds: Mutex<BTreeMap<String, World>>,
    catalog: KindCatalog,
    scheduler: Arc<TickScheduler>,
    listeners: RwLock<Vec<Listener>>,
}

impl Server {
    pub fn new(catalog: KindCatalog, scheduler: Arc<TickScheduler>) -> Self {
        Self {
            worlds: Mutex::new(BTreeMap::new()),
            catalog,
            scheduler,
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub fn scheduler(&self) -> &Arc<TickScheduler> {
        &self.scheduler
    }

    pub fn catalog(&self) -> &KindCatalog {
        &self.catalog
    }

    pub fn add_world(&self, name: impl Into<String>) {
        let name = name.into();
        self.worlds
            .lock()
            .entry(name.clone())
            .or_insert_with(|| World::new(name));
    }

    pub fn world_names(&self) -> Vec<String> {
        self.worlds.lock().keys().cloned().collect()
    }

    pub fn item_count(&self) -> usize {
        self.worlds.lock().values().map(World::item_count).sum()
    }

    /// Register a lifecycle subscriber.
    pub fn subscribe(&self, listener: Listener) {
        self.listeners.write().push(listener);
    }

    /// Run `f` against the named world.
    pub fn with_world<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut World) -> R,
    ) -> Result<R, ServerError> {
        let mut worlds = self.worlds.lock();
        let world = worlds
            .get_mut(name)
            .ok_or_else(|| ServerError::UnknownWorld(name.to_owned()))?;
        Ok(f(world))
    }

    /// Run `f` against whichever world holds `id`.
    fn with_item_world<R>(
        &self,
        id: EntityId,
        f: impl FnOnce(&mut World) -> R,
    ) -> Result<R, ServerError> {
        let mut worlds = self.worlds.lock();
        let world = worlds
            .values_mut()
            .find(|w| w.contains(id))
            .ok_or(ServerError::ItemNotFound(id))?;
        Ok(f(world))
    }

    fn kind(&self, name: &str) -> Result<ItemKind, ServerError> {
        self.catalog
            .resolve(name)
            .ok_or_else(|| ServerError::UnknownKind(name.to_owned()))
    }

    pub fn spawn_item(&self, world: &str, kind: &str, amount: u32) -> Result<EntityId, ServerError> {
        let kind = self.kind(kind)?;
        self.with_world(world, |w| w.spawn_item(kind, amount))
    }

    pub fn drop_item(
        &self,
        world: &str,
        actor: ActorId,
        kind: &str,
        amount: u32,
    ) -> Result<EntityId, ServerError> {
        let kind = self.kind(kind)?;
        self.with_world(world, |w| w.drop_item(actor, kind, amount))
    }

    pub fn pick_up(&self, id: EntityId, actor: Option<ActorId>) -> Result<(), ServerError> {
        self.with_item_world(id, |w| w.pick_up(id, actor))?
            .map(|_| ())
            .ok_or(ServerError::ItemNotFound(id))
    }

    pub fn merge(&self, source: EntityId, target: EntityId) -> Result<bool, ServerError> {
        self.with_item_world(source, |w| w.merge(source, target))
    }

    pub fn kill(&self, id: EntityId) -> Result<bool, ServerError> {
        self.with_item_world(id, |w| w.kill(id))
    }

    /// Remove an item through some path other than the despawn service.
    pub fn destroy(&self, id: EntityId) -> Result<(), ServerError> {
        self.with_item_world(id, |w| w.remove(id))?
            .map(|_| ())
            .ok_or(ServerError::ItemNotFound(id))
    }

    pub fn set_frozen(&self, world: &str, frozen: bool) -> Result<(), ServerError> {
        self.with_world(world, |w| w.set_frozen(frozen))
    }

    /// Deliver every pending world event to subscribers. Returns how many
    /// lifecycle notifications were sent.
    pub fn pump_events(&self) -> usize {
        let events: Vec<WorldEvent> = self
            .worlds
            .lock()
            .values_mut()
            .flat_map(World::drain_events)
            .collect();
        let listeners = self.listeners.read().clone();
        let mut delivered = 0;
        for event in events.into_iter().filter_map(to_lifecycle) {
            for listener in &listeners {
                listener(event.clone());
            }
            delivered += 1;
        }
        delivered
    }

    /// One server tick: deliver events, run due tasks, step every world.
    pub fn tick(&self) {
        self.pump_events();
        self.scheduler.run_tick();
        for world in self.worlds.lock().values_mut() {
            world.step();
        }
    }

    pub fn run_ticks(&self, ticks: u64) {
        for _ in 0..ticks {
            self.tick();
        }
    }
}

fn to_lifecycle(event: WorldEvent) -> Option<LifecycleEvent> {
    match event {
        WorldEvent::ItemSpawned { id, .. } => Some(LifecycleEvent::Spawned { item: id }),
        WorldEvent::ItemDropped { id, actor, .. } => {
            Some(LifecycleEvent::Dropped { item: id, actor })
        }
        WorldEvent::ItemPickedUp { id, actor } => Some(LifecycleEvent::PickedUp {
            item: id,
            picker: actor.map_or(Picker::Other, Picker::Actor),
        }),
        WorldEvent::ItemsMerged { source, target } => {
            Some(LifecycleEvent::Merged { source, target })
        }
        WorldEvent::ItemRemoved { .. } | WorldEvent::Stepped { .. } => None,
    }
}

fn view(id: EntityId, data: &crate::world::ItemData) -> ItemView {
    ItemView {
        id,
        kind: data.kind.clone(),
        valid: !data.dead,
    }
}

impl KindResolver for Server {
    fn resolve_kind(&self, name: &str) -> Option<ItemKind> {
        self.catalog.resolve(name)
    }
}

impl ItemHost for Server {
    fn lookup(&self, id: EntityId) -> Option<ItemView> {
        self.worlds
            .lock()
            .values()
            .find_map(|w| w.get(id).map(|data| view(id, data)))
    }

    fn live_items(&self) -> Vec<ItemView> {
        self.worlds
            .lock()
            .values()
            .flat_map(|w| w.items().iter().map(|(id, data)| view(*id, data)))
            .collect()
    }

    fn remove(&self, id: EntityId) -> Result<(), HostError> {
        let mut worlds = self.worlds.lock();
        let Some(world) = worlds.values_mut().find(|w| w.contains(id)) else {
            return Ok(());
        };
        if world.is_frozen() {
            return Err(HostError::Rejected(format!(
                "world {} is frozen",
                world.name()
            )));
        }
        world.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;

    fn server() -> Server {
        let server = Server::new(KindCatalog::standard(), Arc::new(TickScheduler::new()));
        server.add_world("overworld");
        server.add_world("nether");
        server
    }

    fn recorder(server: &Server) -> Arc<PlMutex<Vec<LifecycleEvent>>> {
        let seen = Arc::new(PlMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        server.subscribe(Arc::new(move |e: LifecycleEvent| sink.lock().push(e)));
        seen
    }

    #[test]
    fn unknown_world_and_kind_are_errors() {
        let s = server();
        assert!(matches!(
            s.spawn_item("end", "dirt", 1),
            Err(ServerError::UnknownWorld(_))
        ));
        assert!(matches!(
            s.spawn_item("overworld", "unobtainium", 1),
            Err(ServerError::UnknownKind(_))
        ));
    }

    #[test]
    fn lookup_spans_worlds() {
        let s = server();
        let a = s.spawn_item("overworld", "dirt", 1).unwrap();
        let b = s.spawn_item("nether", "netherrack", 1).unwrap();
        assert_eq!(s.lookup(a).unwrap().kind.path(), "dirt");
        assert_eq!(s.lookup(b).unwrap().kind.path(), "netherrack");
        assert_eq!(s.live_items().len(), 2);
        assert!(s.lookup(EntityId::new()).is_none());
    }

    #[test]
    fn killed_items_are_visible_but_invalid() {
        let s = server();
        let id = s.spawn_item("overworld", "dirt", 1).unwrap();
        s.kill(id).unwrap();
        assert!(!s.lookup(id).unwrap().valid);
    }

    #[test]
    fn remove_is_noop_when_gone_and_rejected_when_frozen() {
        let s = server();
        assert!(s.remove(EntityId::new()).is_ok());

        let id = s.spawn_item("overworld", "dirt", 1).unwrap();
        s.set_frozen("overworld", true).unwrap();
        assert!(matches!(s.remove(id), Err(HostError::Rejected(_))));
        s.set_frozen("overworld", false).unwrap();
        assert!(s.remove(id).is_ok());
        assert!(s.lookup(id).is_none());
    }

    #[test]
    fn events_are_translated_for_subscribers() {
        let s = server();
        let seen = recorder(&s);
        let actor = ActorId::new();

        let a = s.spawn_item("overworld", "dirt", 1).unwrap();
        let b = s.drop_item("overworld", actor, "dirt", 1).unwrap();
        s.merge(a, b).unwrap();
        s.pick_up(b, Some(actor)).unwrap();
        let c = s.spawn_item("overworld", "bone", 1).unwrap();
        s.pick_up(c, None).unwrap();

        assert_eq!(s.pump_events(), 6);
        assert_eq!(
            *seen.lock(),
            vec![
                LifecycleEvent::Spawned { item: a },
                LifecycleEvent::Dropped { item: b, actor },
                LifecycleEvent::Merged {
                    source: a,
                    target: b
                },
                LifecycleEvent::PickedUp {
                    item: b,
                    picker: Picker::Actor(actor)
                },
                LifecycleEvent::Spawned { item: c },
                LifecycleEvent::PickedUp {
                    item: c,
                    picker: Picker::Other
                },
            ]
        );
    }

    #[test]
    fn removals_and_steps_are_not_forwarded() {
        let s = server();
        let seen = recorder(&s);
        let id = s.spawn_item("overworld", "dirt", 1).unwrap();
        s.pump_events();
        s.destroy(id).unwrap();
        s.tick();
        assert_eq!(seen.lock().len(), 1);
    }
}
