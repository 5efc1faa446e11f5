//! Task record: the bookkeeping for one `submit` call.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use super::{Priority, TaskId, TaskState};

/// Metadata for a task while its `submit` call is in flight.
///
/// Design:
/// - Owned by the submitting future, not by the queue. The wait list only
///   holds what it needs to order and grant slots.
/// - Dropped as soon as `submit` returns, so nothing outlives the task.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub id: TaskId,
    pub priority: Priority,
    pub state: TaskState,

    /// Maximum time to wait for a slot, measured from `enqueued_at`.
    pub timeout: Option<Duration>,

    /// Monotonic enqueue time (drives wait time and timeout).
    pub enqueued_at: Instant,

    /// Wall-clock enqueue time for snapshots.
    pub enqueued_at_wall: DateTime<Utc>,

    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
}

impl TaskRecord {
    pub fn new(
        id: TaskId,
        priority: Priority,
        timeout: Option<Duration>,
        enqueued_at_wall: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            priority,
            state: TaskState::Queued,
            timeout,
            enqueued_at: Instant::now(),
            enqueued_at_wall,
            started_at: None,
            finished_at: None,
        }
    }

    /// Instant after which the task may no longer be granted a slot.
    pub fn deadline(&self) -> Option<Instant> {
        self.timeout.map(|timeout| self.enqueued_at + timeout)
    }

    /// Time spent waiting for a slot (up to now if still queued).
    pub fn waited(&self) -> Duration {
        self.started_at
            .unwrap_or_else(Instant::now)
            .saturating_duration_since(self.enqueued_at)
    }

    /// Mark as running.
    pub fn start(&mut self) {
        self.transition(TaskState::Running);
        self.started_at = Some(Instant::now());
    }

    pub fn complete(&mut self) {
        self.transition(TaskState::Completed);
        self.finished_at = Some(Instant::now());
    }

    pub fn fail(&mut self) {
        self.transition(TaskState::Failed);
        self.finished_at = Some(Instant::now());
    }

    /// Evicted from the queue without running.
    pub fn time_out(&mut self) {
        self.transition(TaskState::TimedOut);
        self.finished_at = Some(Instant::now());
    }

    fn transition(&mut self, next: TaskState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid task transition {:?} -> {:?}",
            self.state,
            next
        );
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn record(timeout: Option<Duration>) -> TaskRecord {
        TaskRecord::new(TaskId::from(Ulid::new()), 0, timeout, Utc::now())
    }

    #[test]
    fn new_record_is_queued() {
        let task = record(None);
        assert_eq!(task.state, TaskState::Queued);
        assert!(task.started_at.is_none());
        assert!(task.deadline().is_none());
    }

    #[test]
    fn deadline_counts_from_enqueue() {
        let task = record(Some(Duration::from_millis(50)));
        assert_eq!(task.deadline(), Some(task.enqueued_at + Duration::from_millis(50)));
    }

    #[tokio::test(start_paused = true)]
    async fn waited_stops_at_start() {
        let mut task = record(None);
        tokio::time::sleep(Duration::from_millis(40)).await;
        task.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        task.complete();

        assert_eq!(task.waited(), Duration::from_millis(40));
        assert_eq!(task.state, TaskState::Completed);
    }

    #[test]
    fn timed_out_record_never_started() {
        let mut task = record(Some(Duration::from_millis(10)));
        task.time_out();
        assert_eq!(task.state, TaskState::TimedOut);
        assert!(task.started_at.is_none());
        assert!(task.finished_at.is_some());
    }
}
