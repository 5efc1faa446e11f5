//! Priority-ordered list of tasks waiting for a slot.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use tokio::time::Instant;

use super::permit::SlotPermit;
use crate::domain::{Priority, TaskId};

/// Position of a waiter in the list.
///
/// Ordered by priority (descending) and then by arrival sequence, so the
/// first key is always the next task to promote. `seq` only grows, which
/// keeps FIFO order inside a priority band no matter what is inserted later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct WaitKey {
    priority: Reverse<Priority>,
    seq: u64,
}

/// A queued task as seen by the scheduler.
#[derive(Debug)]
pub(crate) struct Waiter {
    pub task_id: TaskId,
    pub priority: Priority,
    pub enqueued_at: Instant,
    pub enqueued_at_wall: DateTime<Utc>,
    pub timeout: Option<Duration>,

    /// Where the granted slot is delivered.
    pub grant: oneshot::Sender<SlotPermit>,
}

impl Waiter {
    /// Has the wait exceeded the timeout? Once true the task may not run.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.timeout
            .is_some_and(|timeout| now.saturating_duration_since(self.enqueued_at) >= timeout)
    }
}

#[derive(Debug, Default)]
pub(crate) struct WaitList {
    entries: BTreeMap<WaitKey, Waiter>,
    next_seq: u64,
}

impl WaitList {
    pub fn push(&mut self, waiter: Waiter) -> WaitKey {
        let key = WaitKey {
            priority: Reverse(waiter.priority),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.entries.insert(key, waiter);
        key
    }

    /// Take the highest-priority, earliest-enqueued waiter.
    pub fn pop_front(&mut self) -> Option<Waiter> {
        self.entries.pop_first().map(|(_, waiter)| waiter)
    }

    pub fn remove(&mut self, key: &WaitKey) -> Option<Waiter> {
        self.entries.remove(key)
    }

    /// Waiters in promotion order.
    pub fn iter(&self) -> impl Iterator<Item = &Waiter> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
