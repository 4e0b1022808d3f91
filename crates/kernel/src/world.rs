use std::collections::BTreeMap;

use despawnrate_common::{ActorId, EntityId, ItemKind};

/// An event record produced by every mutation to the world.
///
/// The server drains these each tick and turns the item lifecycle ones into
/// notifications for subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldEvent {
    /// Item appeared on its own (block broken, mob death, ...).
    ItemSpawned { id: EntityId, kind: ItemKind },
    /// Item was thrown out by an actor.
    ItemDropped {
        id: EntityId,
        kind: ItemKind,
        actor: ActorId,
    },
    /// Item left the world into an inventory. `actor` is `None` when the
    /// picker was not an actor (a hopper, a mob).
    ItemPickedUp {
        id: EntityId,
        actor: Option<ActorId>,
    },
    /// `source` was absorbed into `target`.
    ItemsMerged { source: EntityId, target: EntityId },
    /// Item was removed from the world.
    ItemRemoved { id: EntityId },
    /// Simulation advanced one tick.
    Stepped { tick: u64 },
}

/// Per-item data stored in the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemData {
    pub kind: ItemKind,
    pub amount: u32,
    /// Dead items linger until the end of the tick; they are not valid.
    pub dead: bool,
}

/// One region of the server: the items lying in it plus an event log.
///
/// Uses BTreeMap for deterministic iteration order.
#[derive(Debug, Clone, Default)]
pub struct World {
    name: String,
    items: BTreeMap<EntityId, ItemData>,
    tick: u64,
    /// While frozen the world refuses removals (e.g. during a save).
    frozen: bool,
    event_log: Vec<WorldEvent>,
}

impl World {
    /// Create an empty world named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// The world's name, unique within a server.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current simulation tick.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Number of items lying in the world, dead ones included.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// All items, in id order.
    pub fn items(&self) -> &BTreeMap<EntityId, ItemData> {
        &self.items
    }

    /// Look up an item by id.
    pub fn get(&self, id: EntityId) -> Option<&ItemData> {
        self.items.get(&id)
    }

    /// Whether `id` lies in this world.
    pub fn contains(&self, id: EntityId) -> bool {
        self.items.contains_key(&id)
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Events recorded since the last drain.
    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    /// Whether the world currently refuses removals.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Freeze or thaw the world.
    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    /// Spawn a new item on its own. Records `ItemSpawned`.
    pub fn spawn_item(&mut self, kind: ItemKind, amount: u32) -> EntityId {
        let id = EntityId::new();
        self.insert(id, kind.clone(), amount);
        self.event_log.push(WorldEvent::ItemSpawned { id, kind });
        id
    }

    /// Spawn an item thrown by `actor`. Records `ItemDropped`.
    pub fn drop_item(&mut self, actor: ActorId, kind: ItemKind, amount: u32) -> EntityId {
        let id = EntityId::new();
        self.insert(id, kind.clone(), amount);
        self.event_log
            .push(WorldEvent::ItemDropped { id, kind, actor });
        id
    }

    fn insert(&mut self, id: EntityId, kind: ItemKind, amount: u32) {
        self.items.insert(
            id,
            ItemData {
                kind,
                amount,
                dead: false,
            },
        );
    }

    /// Take an item out of the world. Returns its data if it was there.
    pub fn pick_up(&mut self, id: EntityId, actor: Option<ActorId>) -> Option<ItemData> {
        let data = self.items.remove(&id)?;
        self.event_log.push(WorldEvent::ItemPickedUp { id, actor });
        Some(data)
    }

    /// Fold `source` into `target`. Both must be live and of the same kind.
    pub fn merge(&mut self, source: EntityId, target: EntityId) -> bool {
        if source == target {
            return false;
        }
        let mergeable = match (self.items.get(&source), self.items.get(&target)) {
            (Some(s), Some(t)) => !s.dead && !t.dead && s.kind == t.kind,
            _ => false,
        };
        if !mergeable {
            return false;
        }
        // checked above
        let Some(absorbed) = self.items.remove(&source) else {
            return false;
        };
        if let Some(t) = self.items.get_mut(&target) {
            t.amount = t.amount.saturating_add(absorbed.amount);
        }
        self.event_log
            .push(WorldEvent::ItemsMerged { source, target });
        true
    }

    /// Remove an item. Returns the data if it existed.
    pub fn remove(&mut self, id: EntityId) -> Option<ItemData> {
        let data = self.items.remove(&id);
        if data.is_some() {
            self.event_log.push(WorldEvent::ItemRemoved { id });
        }
        data
    }

    /// Mark an item dead; it stays visible but invalid until the next step.
    pub fn kill(&mut self, id: EntityId) -> bool {
        match self.items.get_mut(&id) {
            Some(data) => {
                data.dead = true;
                true
            }
            None => false,
        }
    }

    /// Advance one tick, clearing out dead items.
    pub fn step(&mut self) {
        self.tick += 1;
        let dead: Vec<EntityId> = self
            .items
            .iter()
            .filter(|(_, d)| d.dead)
            .map(|(id, _)| *id)
            .collect();
        for id in dead {
            self.remove(id);
        }
        self.event_log.push(WorldEvent::Stepped { tick: self.tick });
    }
}
