//! Ports - 抽象化レイヤー
//!
//! キューが外部から受け取るもの（時刻・ID）を trait で切り出します。
//! テストでは FixedClock などに差し替えます。

pub mod clock;
pub mod id_generator;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
