use std::time::Duration;

use thiserror::Error;

use crate::domain::TaskId;

/// Errors produced by the queue itself.
///
/// Operation errors never appear here: `submit` returns the operation's own
/// error type and only converts these into it via `From<QueueError>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Still waiting for a slot when the timeout elapsed. The operation was
    /// never invoked.
    #[error("queue timeout: {task_id} waited {waited:?} without getting a slot")]
    Timeout { task_id: TaskId, waited: Duration },

    #[error("invalid submit options: {0}")]
    InvalidOptions(String),
}

impl QueueError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, QueueError::Timeout { .. })
    }
}

/// Rejected configuration, reported before any queue exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("default timeout must be greater than zero (omit it to wait indefinitely)")]
    ZeroTimeout,

    #[error("invalid value for {key}: {value:?}")]
    Env { key: &'static str, value: String },
}
