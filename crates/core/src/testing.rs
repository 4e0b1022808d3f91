//! In-memory host, scheduler and command sender for unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};

use despawnrate_common::{EntityId, ItemKind, TaskId};
use parking_lot::Mutex;

use crate::host::{
    CommandSender, HostError, ItemHost, ItemView, KindResolver, OnceTask, RepeatingTask,
    TaskScheduler,
};

const KNOWN_KINDS: &[&str] = &["dirt", "sand", "gravel", "cobblestone", "rotten_flesh"];

#[derive(Default)]
pub struct FakeHost {
    items: Mutex<HashMap<EntityId, ItemView>>,
    failing: Mutex<HashSet<EntityId>>,
    removed: Mutex<Vec<EntityId>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&self, kind: &str) -> EntityId {
        let id = EntityId::new();
        let view = ItemView {
            id,
            kind: ItemKind::parse(kind).unwrap(),
            valid: true,
        };
        self.items.lock().insert(id, view);
        id
    }

    /// Remove an item without going through `ItemHost::remove`.
    pub fn vanish(&self, id: EntityId) {
        self.items.lock().remove(&id);
    }

    pub fn invalidate(&self, id: EntityId) {
        if let Some(item) = self.items.lock().get_mut(&id) {
            item.valid = false;
        }
    }

    pub fn fail_removal(&self, id: EntityId) {
        self.failing.lock().insert(id);
    }

    pub fn removed(&self) -> Vec<EntityId> {
        self.removed.lock().clone()
    }
}

impl KindResolver for FakeHost {
    fn resolve_kind(&self, name: &str) -> Option<ItemKind> {
        let kind = ItemKind::parse(name).ok()?;
        KNOWN_KINDS
            .iter()
            .any(|k| ItemKind::parse(k).ok().as_ref() == Some(&kind))
            .then_some(kind)
    }
}

impl ItemHost for FakeHost {
    fn lookup(&self, id: EntityId) -> Option<ItemView> {
        self.items.lock().get(&id).cloned()
    }

    fn live_items(&self) -> Vec<ItemView> {
        self.items.lock().values().cloned().collect()
    }

    fn remove(&self, id: EntityId) -> Result<(), HostError> {
        if self.failing.lock().contains(&id) {
            return Err(HostError::Rejected("protected".into()));
        }
        self.items.lock().remove(&id);
        self.removed.lock().push(id);
        Ok(())
    }
}

enum Scheduled {
    Once(OnceTask),
    Repeating(RepeatingTask),
}

/// Scheduler whose tasks only run when the test says so.
#[derive(Default)]
pub struct ManualScheduler {
    tasks: Mutex<BTreeMap<TaskId, Scheduled>>,
    cancelled: Mutex<HashSet<TaskId>>,
    next_id: Mutex<u64>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, task: Scheduled) -> TaskId {
        let mut next = self.next_id.lock();
        *next += 1;
        let id = TaskId(*next);
        self.tasks.lock().insert(id, task);
        id
    }

    /// Run every pending one-shot task, including ones they schedule.
    pub fn run_once_tasks(&self) -> usize {
        let mut ran = 0;
        loop {
            let due: Vec<OnceTask> = {
                let mut tasks = self.tasks.lock();
                let ids: Vec<TaskId> = tasks
                    .iter()
                    .filter(|(_, t)| matches!(t, Scheduled::Once(_)))
                    .map(|(id, _)| *id)
                    .collect();
                ids.into_iter()
                    .filter_map(|id| match tasks.remove(&id) {
                        Some(Scheduled::Once(task)) => Some(task),
                        _ => None,
                    })
                    .collect()
            };
            if due.is_empty() {
                return ran;
            }
            for task in due {
                task();
                ran += 1;
            }
        }
    }

    /// Fire each live repeating task once. Returns how many fired.
    pub fn fire_repeating(&self) -> usize {
        let taken: Vec<(TaskId, RepeatingTask)> = {
            let mut tasks = self.tasks.lock();
            let ids: Vec<TaskId> = tasks
                .iter()
                .filter(|(_, t)| matches!(t, Scheduled::Repeating(_)))
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| match tasks.remove(&id) {
                    Some(Scheduled::Repeating(task)) => Some((id, task)),
                    _ => None,
                })
                .collect()
        };
        let fired = taken.len();
        for (id, mut task) in taken {
            task();
            if !self.cancelled.lock().contains(&id) {
                self.tasks.lock().insert(id, Scheduled::Repeating(task));
            }
        }
        fired
    }

    pub fn repeating_count(&self) -> usize {
        self.tasks
            .lock()
            .values()
            .filter(|t| matches!(t, Scheduled::Repeating(_)))
            .count()
    }
}

impl TaskScheduler for ManualScheduler {
    fn schedule_once(&self, _delay_ticks: u64, task: OnceTask) -> TaskId {
        self.insert(Scheduled::Once(task))
    }

    fn schedule_repeating(
        &self,
        _delay_ticks: u64,
        _period_ticks: u64,
        task: RepeatingTask,
    ) -> TaskId {
        self.insert(Scheduled::Repeating(task))
    }

    fn cancel(&self, id: TaskId) {
        self.cancelled.lock().insert(id);
        self.tasks.lock().remove(&id);
    }
}

pub struct RecordingSender {
    name: String,
    messages: Mutex<Vec<String>>,
}

impl RecordingSender {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl CommandSender for RecordingSender {
    fn name(&self) -> &str {
        &self.name
    }

    fn send_message(&self, message: &str) {
        self.messages.lock().push(message.to_owned());
    }
}
