//! Per-submission options.

use std::time::Duration;

use crate::domain::Priority;
use crate::error::QueueError;

/// Options for one `submit` call.
///
/// - `priority`: higher is granted a slot first (default 0).
/// - `timeout`: max wait for a slot; `None` falls back to the queue's
///   configured default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitOptions {
    pub priority: Priority,
    pub timeout: Option<Duration>,
}

impl SubmitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Effective wait timeout for this submission.
    pub(crate) fn resolve_timeout(
        &self,
        default: Option<Duration>,
    ) -> Result<Option<Duration>, QueueError> {
        match self.timeout {
            Some(timeout) if timeout.is_zero() => Err(QueueError::InvalidOptions(
                "timeout must be greater than zero".to_string(),
            )),
            Some(timeout) => Ok(Some(timeout)),
            None => Ok(default),
        }
    }
}
