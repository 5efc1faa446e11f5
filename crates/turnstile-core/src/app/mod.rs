//! App - アプリケーション層
//!
//! # 主要コンポーネント
//! - **QueueBuilder**: 設定を検証して RequestQueue を構築
//! - **App**: composition root（キュー + ActionRunner）
//! - **ActionRunner**: read/write 規約つきでアクションを実行

pub mod action;
pub mod builder;

pub use self::action::{
    ActionKind, ActionMessages, ActionOptions, ActionResult, ActionRunner, BUSY_MESSAGE,
    GENERIC_MESSAGE,
};
pub use self::builder::{App, QueueBuilder};
