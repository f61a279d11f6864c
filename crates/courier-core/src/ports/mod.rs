//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! dispatcher の中核は具体的な document store や時計を知らず、
//! ここにある trait だけに依存します。

pub mod audit_store;
pub mod clock;
pub mod handler;
pub mod id_generator;

pub use self::audit_store::AuditStore;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::handler::{FnHandler, Handler, handler_fn};
pub use self::id_generator::{IdGenerator, UlidGenerator};
