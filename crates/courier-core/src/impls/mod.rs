//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryAuditStore**: 開発用の監査ストア
//!
//! 本番の document store 実装は別クレートに置く想定です。

pub mod inmem_audit;

pub use self::inmem_audit::InMemoryAuditStore;
