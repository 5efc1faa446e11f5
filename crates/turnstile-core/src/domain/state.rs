//! Task state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle of one submitted task.
///
/// State transitions:
/// - Queued -> Running -> Completed
/// - Queued -> Running -> Failed
/// - Queued -> TimedOut (never ran)
///
/// Only `Queued` has outgoing transitions into a non-terminal state; nothing
/// goes back to `Queued`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Waiting for a slot.
    Queued,

    /// Holding a slot, operation in flight.
    Running,

    /// Operation returned `Ok`.
    Completed,

    /// Operation returned `Err` or panicked.
    Failed,

    /// Waited longer than its timeout; the operation was never invoked.
    TimedOut,
}

impl TaskState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::TimedOut
        )
    }

    pub fn can_transition_to(self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Queued, TaskState::Running)
                | (TaskState::Queued, TaskState::TimedOut)
                | (TaskState::Running, TaskState::Completed)
                | (TaskState::Running, TaskState::Failed)
        )
    }
}
