//! ActionRunner - 画面側の「アクション」をキュー経由で実行する薄いラッパー
//!
//! # 役割
//! - read / write の優先度規約（read=0, write=1）はここだけが知っている
//! - キューのタイムアウトは「混雑中」、それ以外の失敗は汎用メッセージに変換
//! - 元のエラーはログに残す

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::domain::Priority;
use crate::error::QueueError;
use crate::queue::{RequestQueue, SubmitOptions};

pub const BUSY_MESSAGE: &str = "Server is busy. Please try again in a moment.";
pub const GENERIC_MESSAGE: &str = "Something went wrong. Please try again.";

/// Kind of action, mapped to a queue priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Read,
    Write,
}

impl ActionKind {
    /// Writes jump ahead of reads when both are waiting.
    pub fn priority(self) -> Priority {
        match self {
            ActionKind::Read => 0,
            ActionKind::Write => 1,
        }
    }
}

/// Per-call options.
#[derive(Debug, Clone)]
pub struct ActionOptions {
    /// Route through the request queue (default: true).
    pub use_queue: bool,

    /// Message shown when the operation itself fails.
    pub error_message: Option<String>,

    /// Wait timeout override for the queue.
    pub timeout: Option<Duration>,
}

impl Default for ActionOptions {
    fn default() -> Self {
        Self {
            use_queue: true,
            error_message: None,
            timeout: None,
        }
    }
}

impl ActionOptions {
    pub fn without_queue(mut self) -> Self {
        self.use_queue = false;
        self
    }

    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Normalized result handed back to UI handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult<T> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ActionResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(self.error.unwrap_or_else(|| GENERIC_MESSAGE.to_string())),
        }
    }
}

/// User-facing messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMessages {
    pub busy: String,
    pub generic: String,
}

impl Default for ActionMessages {
    fn default() -> Self {
        Self {
            busy: BUSY_MESSAGE.to_string(),
            generic: GENERIC_MESSAGE.to_string(),
        }
    }
}

/// Why an action failed, before it is flattened into a message.
enum ActionFailure<E> {
    Queue(QueueError),
    Operation(E),
}

impl<E> From<QueueError> for ActionFailure<E> {
    fn from(err: QueueError) -> Self {
        ActionFailure::Queue(err)
    }
}

/// Runs actions through the shared request queue.
#[derive(Clone)]
pub struct ActionRunner {
    queue: RequestQueue,
    messages: ActionMessages,
}

impl ActionRunner {
    pub fn new(queue: RequestQueue) -> Self {
        Self {
            queue,
            messages: ActionMessages::default(),
        }
    }

    pub fn with_messages(mut self, messages: ActionMessages) -> Self {
        self.messages = messages;
        self
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    pub async fn read<F, Fut, T, E>(&self, name: &str, operation: F) -> ActionResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.run(name, ActionKind::Read, ActionOptions::default(), operation)
            .await
    }

    pub async fn write<F, Fut, T, E>(&self, name: &str, operation: F) -> ActionResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.run(name, ActionKind::Write, ActionOptions::default(), operation)
            .await
    }

    /// Run `operation` and flatten the outcome into an `ActionResult`.
    ///
    /// `name` only labels the log lines.
    pub async fn run<F, Fut, T, E>(
        &self,
        name: &str,
        kind: ActionKind,
        options: ActionOptions,
        operation: F,
    ) -> ActionResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let outcome: Result<T, ActionFailure<E>> = if options.use_queue {
            let mut submit = SubmitOptions::new().with_priority(kind.priority());
            if let Some(timeout) = options.timeout {
                submit = submit.with_timeout(timeout);
            }
            self.queue
                .submit(
                    move || async move { operation().await.map_err(ActionFailure::Operation) },
                    submit,
                )
                .await
        } else {
            operation().await.map_err(ActionFailure::Operation)
        };

        match outcome {
            Ok(data) => ActionResult::ok(data),
            Err(ActionFailure::Queue(err)) if err.is_timeout() => {
                warn!(action = name, ?kind, error = %err, "Action rejected: queue busy");
                ActionResult::err(self.messages.busy.clone())
            }
            Err(ActionFailure::Queue(err)) => {
                error!(action = name, ?kind, error = %err, "Action could not be queued");
                ActionResult::err(self.failure_message(&options))
            }
            Err(ActionFailure::Operation(err)) => {
                error!(action = name, ?kind, error = %err, "Action failed");
                ActionResult::err(self.failure_message(&options))
            }
        }
    }

    fn failure_message(&self, options: &ActionOptions) -> String {
        options
            .error_message
            .clone()
            .unwrap_or_else(|| self.messages.generic.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::QueueConfig;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::oneshot;

    fn runner(max_concurrency: usize) -> ActionRunner {
        ActionRunner::new(RequestQueue::new(QueueConfig::new(max_concurrency, None)).unwrap())
    }

    #[test]
    fn writes_outrank_reads() {
        assert!(ActionKind::Write.priority() > ActionKind::Read.priority());
        assert_eq!(ActionKind::Read.priority(), 0);
        assert_eq!(ActionKind::Write.priority(), 1);
    }

    #[tokio::test]
    async fn success_wraps_data() {
        let runner = runner(1);
        let result = runner
            .read("getProjects", || async { Ok::<_, String>(vec![1, 2, 3]) })
            .await;

        assert_eq!(result, ActionResult::ok(vec![1, 2, 3]));
        assert_eq!(runner.queue().stats().total_completed, 1);
    }

    #[tokio::test]
    async fn operation_error_uses_generic_message() {
        let runner = runner(1);
        let result: ActionResult<()> = runner
            .write("updateAccess", || async { Err("duplicate key".to_string()) })
            .await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(GENERIC_MESSAGE));
        assert_eq!(runner.queue().stats().total_failed, 1);
    }

    #[tokio::test]
    async fn per_call_error_message_wins() {
        let runner = runner(1);
        let result: ActionResult<()> = runner
            .run(
                "deleteUser",
                ActionKind::Write,
                ActionOptions::default().with_error_message("Could not delete user."),
                || async { Err("fk violation") },
            )
            .await;

        assert_eq!(result.error.as_deref(), Some("Could not delete user."));
    }

    #[tokio::test(start_paused = true)]
    async fn queue_timeout_reports_busy() {
        let runner = runner(1);
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let blocker = tokio::spawn({
            let runner = runner.clone();
            async move {
                runner
                    .write("slowWrite", move || async move {
                        let _ = release_rx.await;
                        Ok::<_, String>(())
                    })
                    .await
            }
        });
        while runner.queue().running() == 0 {
            tokio::task::yield_now().await;
        }

        let invoked = Arc::new(AtomicBool::new(false));
        let spy = Arc::clone(&invoked);
        let result: ActionResult<()> = runner
            .run(
                "getProjects",
                ActionKind::Read,
                ActionOptions::default().with_timeout(Duration::from_millis(50)),
                move || async move {
                    spy.store(true, Ordering::SeqCst);
                    Ok::<_, String>(())
                },
            )
            .await;

        assert_eq!(result, ActionResult::err(BUSY_MESSAGE));
        assert!(!invoked.load(Ordering::SeqCst));

        release_tx.send(()).unwrap();
        assert!(blocker.await.unwrap().success);
    }

    #[tokio::test]
    async fn bypassing_the_queue_runs_directly() {
        let runner = runner(1);
        let result = runner
            .run(
                "health",
                ActionKind::Read,
                ActionOptions::default().without_queue(),
                || async { Ok::<_, String>("ok") },
            )
            .await;

        assert_eq!(result.data, Some("ok"));
        assert_eq!(runner.queue().stats().total_submitted, 0);
    }

    #[tokio::test]
    async fn custom_messages_apply() {
        let runner = runner(1).with_messages(ActionMessages {
            busy: "busy".to_string(),
            generic: "nope".to_string(),
        });
        let result: ActionResult<()> = runner
            .read("getProjects", || async { Err("boom") })
            .await;

        assert_eq!(result.error.as_deref(), Some("nope"));
    }

    #[test]
    fn result_serializes_without_empty_fields() {
        let ok = serde_json::to_value(ActionResult::ok(5)).unwrap();
        assert_eq!(ok, serde_json::json!({ "success": true, "data": 5 }));

        let err = serde_json::to_value(ActionResult::<i32>::err("busy")).unwrap();
        assert_eq!(err, serde_json::json!({ "success": false, "error": "busy" }));
    }

    #[test]
    fn into_result_maps_failure_to_message() {
        assert_eq!(ActionResult::ok(1).into_result(), Ok(1));
        assert_eq!(
            ActionResult::<i32>::err("busy").into_result(),
            Err("busy".to_string())
        );
    }
}
