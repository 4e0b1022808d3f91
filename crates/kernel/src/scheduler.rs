//! Cooperative single-threaded task queue driven one tick at a time.
//!
//! # Invariants
//! - Tasks never run while the queue lock is held, so a task may schedule or
//!   cancel anything, itself included.
//! - A task scheduled with delay `d` runs on the tick `current + max(d, 1)`.
//! - Tasks due on the same tick run in submission order.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use despawnrate_common::{MILLIS_PER_TICK, TaskId};
use despawnrate_core::{Clock, OnceTask, RepeatingTask, TaskScheduler};
use parking_lot::Mutex;

enum Job {
    Once(OnceTask),
    Repeating { period: u64, task: RepeatingTask },
}

struct Entry {
    due: u64,
    job: Job,
}

#[derive(Default)]
struct Queue {
    tick: u64,
    next_id: u64,
    tasks: BTreeMap<TaskId, Entry>,
    running: HashSet<TaskId>,
    cancelled_while_running: HashSet<TaskId>,
}

#[derive(Default)]
pub struct TickScheduler {
    queue: Mutex<Queue>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_tick(&self) -> u64 {
        self.queue.lock().tick
    }

    /// Tasks waiting to run, repeating ones included.
    pub fn pending(&self) -> usize {
        self.queue.lock().tasks.len()
    }

    /// Cancellations recorded against tasks that were mid-run.
    #[cfg(test)]
    fn cancelled_while_running(&self) -> usize {
        self.queue.lock().cancelled_while_running.len()
    }

    fn submit(&self, delay_ticks: u64, job: Job) -> TaskId {
        let mut q = self.queue.lock();
        q.next_id += 1;
        let id = TaskId(q.next_id);
        let due = q.tick + delay_ticks.max(1);
        q.tasks.insert(id, Entry { due, job });
        id
    }

    /// Advance one tick and run everything due. Returns how many tasks ran.
    pub fn run_tick(&self) -> usize {
        let (tick, due) = {
            let mut q = self.queue.lock();
            q.tick += 1;
            let tick = q.tick;
            let ids: Vec<TaskId> = q
                .tasks
                .iter()
                .filter(|(_, e)| e.due <= tick)
                .map(|(id, _)| *id)
                .collect();
            let mut due = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(entry) = q.tasks.remove(&id) {
                    q.running.insert(id);
                    due.push((id, entry.job));
                }
            }
            (tick, due)
        };

        let ran = due.len();
        for (id, job) in due {
            match job {
                Job::Once(task) => {
                    task();
                    let mut q = self.queue.lock();
                    q.running.remove(&id);
                    q.cancelled_while_running.remove(&id);
                }
                Job::Repeating { period, mut task } => {
                    task();
                    let mut q = self.queue.lock();
                    q.running.remove(&id);
                    if !q.cancelled_while_running.remove(&id) {
                        q.tasks.insert(
                            id,
                            Entry {
                                due: tick + period.max(1),
                                job: Job::Repeating { period, task },
                            },
                        );
                    }
                }
            }
        }
        if ran > 0 {
            tracing::trace!(tick, ran, "scheduler tick");
        }
        ran
    }
}

impl TaskScheduler for TickScheduler {
    fn schedule_once(&self, delay_ticks: u64, task: OnceTask) -> TaskId {
        self.submit(delay_ticks, Job::Once(task))
    }

    fn schedule_repeating(
        &self,
        delay_ticks: u64,
        period_ticks: u64,
        task: RepeatingTask,
    ) -> TaskId {
        self.submit(
            delay_ticks,
            Job::Repeating {
                period: period_ticks,
                task,
            },
        )
    }

    fn cancel(&self, id: TaskId) {
        let mut q = self.queue.lock();
        if q.tasks.remove(&id).is_none() && q.running.contains(&id) {
            q.cancelled_while_running.insert(id);
        }
    }
}

/// Wall clock derived from the scheduler's tick count.
pub struct TickClock {
    scheduler: Arc<TickScheduler>,
    epoch_millis: u64,
}

impl TickClock {
    pub fn new(scheduler: Arc<TickScheduler>, epoch_millis: u64) -> Self {
        Self {
            scheduler,
            epoch_millis,
        }
    }
}

impl Clock for TickClock {
    fn now_millis(&self) -> u64 {
        self.epoch_millis + self.scheduler.current_tick() * MILLIS_PER_TICK
    }
}
