//! Builders - キューとアプリケーションの構築とワイヤリング
//!
//! # 方針
//! - 設定の検証は build() 時に行う（Fail-fast）
//! - キューはモジュールレベルのシングルトンにしない。
//!   composition root で作って ActionRunner に渡す

use std::sync::Arc;

use crate::app::ActionRunner;
use crate::error::ConfigError;
use crate::ports::{Clock, IdGenerator, SystemClock, UlidGenerator};
use crate::queue::{QueueConfig, RequestQueue};

/// QueueBuilder は RequestQueue を構築
///
/// # 使用例
/// ```ignore
/// let queue = QueueBuilder::new(QueueConfig::from_env()?)
///     .with_clock(FixedClock::new(at))
///     .build()?;
/// ```
pub struct QueueBuilder {
    config: QueueConfig,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl QueueBuilder {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            ids: Arc::new(UlidGenerator::new(SystemClock)),
        }
    }

    /// 壁時計を差し替える（ID の timestamp 部分にも使う）
    pub fn with_clock<C: Clock + Clone + 'static>(mut self, clock: C) -> Self {
        self.ids = Arc::new(UlidGenerator::new(clock.clone()));
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    /// 設定を検証して RequestQueue を生成
    ///
    /// # 検証
    /// - max_concurrency >= 1
    /// - default timeout が 0 でないこと
    pub fn build(self) -> Result<RequestQueue, ConfigError> {
        self.config.validate()?;
        Ok(RequestQueue::from_parts(self.config, self.clock, self.ids))
    }
}

/// App は composition root
///
/// プロセス起動時に一度だけ作り、キューと ActionRunner を保持します。
pub struct App {
    pub queue: RequestQueue,
    pub actions: ActionRunner,
}

impl App {
    pub fn new(config: QueueConfig) -> Result<Self, ConfigError> {
        let queue = QueueBuilder::new(config).build()?;
        let actions = ActionRunner::new(queue.clone());
        Ok(Self { queue, actions })
    }

    /// `TURNSTILE_*` 環境変数から構築
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(QueueConfig::from_env()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskId;
    use crate::ports::FixedClock;
    use crate::queue::SubmitOptions;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;
    use ulid::Ulid;

    #[test]
    fn test_build_success() {
        let queue = QueueBuilder::new(QueueConfig::new(3, Some(Duration::from_secs(1)))).build();
        assert!(queue.is_ok());
        assert_eq!(queue.unwrap().config().max_concurrency, 3);
    }

    #[test]
    fn test_build_rejects_zero_concurrency() {
        let queue = QueueBuilder::new(QueueConfig::new(0, None)).build();
        assert!(matches!(queue, Err(ConfigError::ZeroConcurrency)));
    }

    #[test]
    fn test_build_rejects_zero_timeout() {
        let queue = QueueBuilder::new(QueueConfig::new(1, Some(Duration::ZERO))).build();
        assert!(matches!(queue, Err(ConfigError::ZeroTimeout)));
    }

    #[tokio::test]
    async fn fixed_clock_shows_up_in_queued_entries() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let queue = QueueBuilder::new(QueueConfig::new(1, None))
            .with_clock(FixedClock::new(at))
            .build()
            .unwrap();

        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let blocker = tokio::spawn({
            let queue = queue.clone();
            async move {
                queue
                    .submit(
                        move || async move {
                            let _ = release_rx.await;
                            Ok::<_, crate::QueueError>(())
                        },
                        SubmitOptions::new(),
                    )
                    .await
            }
        });
        while queue.running() == 0 {
            tokio::task::yield_now().await;
        }

        let waiter = tokio::spawn({
            let queue = queue.clone();
            async move {
                queue
                    .submit(|| async { Ok::<_, crate::QueueError>(()) }, SubmitOptions::new())
                    .await
            }
        });
        while queue.queued() == 0 {
            tokio::task::yield_now().await;
        }

        let entries = queue.queued_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].enqueued_at, at);
        assert_eq!(entries[0].task_id.as_ulid().timestamp_ms(), at.timestamp_millis() as u64);

        release_tx.send(()).unwrap();
        blocker.await.unwrap().unwrap();
        waiter.await.unwrap().unwrap();
    }

    struct FixedIds;

    impl IdGenerator for FixedIds {
        fn generate_task_id(&self) -> TaskId {
            TaskId::from(Ulid::from_parts(0, 7))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn custom_id_generator_is_used() {
        let queue = QueueBuilder::new(QueueConfig::new(1, None))
            .with_id_generator(FixedIds)
            .build()
            .unwrap();

        let blocker = tokio::spawn({
            let queue = queue.clone();
            async move {
                queue
                    .submit(
                        || async {
                            tokio::time::sleep(Duration::from_secs(1)).await;
                            Ok::<_, crate::QueueError>(())
                        },
                        SubmitOptions::new(),
                    )
                    .await
            }
        });
        while queue.running() == 0 {
            tokio::task::yield_now().await;
        }

        let err = queue
            .submit(
                || async { Ok::<_, crate::QueueError>(()) },
                SubmitOptions::new().with_timeout(Duration::from_millis(10)),
            )
            .await
            .unwrap_err();

        match err {
            crate::QueueError::Timeout { task_id, .. } => {
                assert_eq!(task_id, TaskId::from(Ulid::from_parts(0, 7)));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        blocker.await.unwrap().unwrap();
    }

    #[test]
    fn app_wires_queue_into_action_runner() {
        let app = App::new(QueueConfig::new(2, None).with_name("site")).unwrap();
        assert_eq!(app.queue.config().name, "site");
        assert_eq!(app.actions.queue().config().max_concurrency, 2);
    }
}
