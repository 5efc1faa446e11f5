//! turnstile-core
//!
//! Bounded-concurrency request queue with priority ordering and wait
//! timeouts, plus the action wrapper that routes application work through it.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（TaskId, TaskState, TaskRecord, Priority）
//! - **ports**: 抽象化レイヤー（Clock, IdGenerator）
//! - **queue**: RequestQueue 本体（設定・待ち行列・スロット）
//! - **app**: 構築とワイヤリング（QueueBuilder, App, ActionRunner）
//! - **observability**: スナップショットと統計
//! - **error**: エラー型

pub mod app;
pub mod domain;
pub mod error;
pub mod observability;
pub mod ports;
pub mod queue;

pub use app::{ActionKind, ActionOptions, ActionResult, ActionRunner, App, QueueBuilder};
pub use domain::{Priority, TaskId, TaskState};
pub use error::{ConfigError, QueueError};
pub use observability::{QueueSnapshot, QueueStats, QueuedEntry};
pub use queue::{QueueConfig, RequestQueue, SubmitOptions};
