//! Read-only views of the queue for logging, health endpoints and tests.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Priority, TaskId};

/// Cumulative counters since the queue was built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub total_submitted: u64,
    pub total_started: u64,
    pub total_completed: u64,
    pub total_failed: u64,
    pub total_timed_out: u64,

    /// Caller dropped the `submit` future before the operation ran.
    pub total_abandoned: u64,

    /// Sum of queue waits of started tasks.
    pub total_wait_time_ms: u64,

    pub peak_queue_depth: usize,
    pub peak_running: usize,
}

impl QueueStats {
    /// Mean time a started task spent waiting for its slot.
    pub fn average_wait(&self) -> Duration {
        if self.total_started == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.total_wait_time_ms / self.total_started)
    }

    /// Tasks that reached a terminal state.
    pub fn settled(&self) -> u64 {
        self.total_completed + self.total_failed + self.total_timed_out
    }
}

/// Point-in-time view of the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub name: String,
    pub running: usize,
    pub queued: usize,
    pub max_concurrency: usize,
    pub stats: QueueStats,
}

impl QueueSnapshot {
    /// Every slot is taken and work is waiting (backpressure).
    pub fn saturated(&self) -> bool {
        self.running >= self.max_concurrency && self.queued > 0
    }

    pub fn free_slots(&self) -> usize {
        self.max_concurrency.saturating_sub(self.running)
    }
}

/// One waiting task, as listed by `RequestQueue::queued_entries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedEntry {
    pub task_id: TaskId,
    pub priority: Priority,

    /// 1-based position in promotion order.
    pub position: usize,

    pub enqueued_at: DateTime<Utc>,
    pub waited: Duration,
    pub timeout: Option<Duration>,
}
