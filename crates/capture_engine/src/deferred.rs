//! Tick-deferred continuations.
//!
//! Work scheduled "N ticks later" runs on the same sequential event stream as
//! everything else, so each task must re-check the state it depends on when
//! it finally executes.

use crate::types::PlayerId;
use crate::zone::ZoneClass;

/// Work that can be postponed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredTask {
    /// Tell a player they are inside a ring, if they still are.
    ZoneNotice {
        player: PlayerId,
        point_id: String,
        class: ZoneClass,
    },
}

#[derive(Debug)]
struct Scheduled {
    due: u64,
    task: DeferredTask,
}

/// FIFO queue of tasks keyed by the tick they become due.
#[derive(Debug, Default)]
pub struct DeferredQueue {
    pending: Vec<Scheduled>,
}

impl DeferredQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `task` to run `delay` ticks after `current_tick`.
    pub fn schedule(&mut self, current_tick: u64, delay: u64, task: DeferredTask) {
        self.pending.push(Scheduled {
            due: current_tick.saturating_add(delay.max(1)),
            task,
        });
    }

    /// Removes and returns every task due at or before `tick`, in scheduling order.
    pub fn drain_due(&mut self, tick: u64) -> Vec<DeferredTask> {
        let (due, later): (Vec<Scheduled>, Vec<Scheduled>) =
            std::mem::take(&mut self.pending)
                .into_iter()
                .partition(|scheduled| scheduled.due <= tick);
        self.pending = later;
        due.into_iter().map(|scheduled| scheduled.task).collect()
    }

    /// Whether an identical task is already waiting.
    pub fn contains(&self, task: &DeferredTask) -> bool {
        self.pending.iter().any(|scheduled| &scheduled.task == task)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
