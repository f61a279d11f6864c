//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせて dispatcher を実装します。
//!
//! # 主要コンポーネント
//! - **DispatcherBuilder**: 起動時のワイヤリング
//! - **Dispatcher**: publish / register の受付（producer 側ハンドル）
//! - **HandlerRegistry**: イベント名 → handler 一覧（loop だけが触る）
//! - **ExecutionUnit**: 1 イベント分の handler チェーンと監査記録

pub mod builder;
pub mod dispatcher;
pub mod execution;
pub mod registry;

pub use self::builder::DispatcherBuilder;
pub use self::dispatcher::{Dispatcher, PublishError};
pub use self::execution::{ExecutionSummary, ExecutionUnit};
pub use self::registry::HandlerRegistry;
