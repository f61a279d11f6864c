//! AuditStore port - 監査レコードの保存先（document store）
//!
//! dispatcher から見ると write-only です。読み出しは実装ごとの責務。
//!
//! # 実装
//! - **InMemoryAuditStore**: 開発用・テスト用（impls 参照）

use async_trait::async_trait;

use crate::domain::{AuditCompletion, AuditRecord, EventRecordId, StoreError};

/// AuditStore は keyed document store として扱う
///
/// # 設計原則
/// - 1 event = 1 record。ID は呼び出し側が発行する
/// - insert は handler 実行前、update_by_id は handler 実行後に 1 回だけ
/// - 並行する execution unit は別々の ID に書くので、衝突は store 任せ
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn insert(&self, record: &AuditRecord) -> Result<(), StoreError>;

    async fn update_by_id(
        &self,
        id: EventRecordId,
        completion: &AuditCompletion,
    ) -> Result<(), StoreError>;
}
