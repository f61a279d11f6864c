//! Errors - エラー型と分類
//!
//! - HandlerError: handler が返す失敗（panic も同じ値に変換される）
//! - StoreError: 監査ストアの失敗
//! - ExecutionError: execution unit の中で起きた失敗（loop には伝播しない）

use thiserror::Error;

use super::ids::EventRecordId;

/// Failure of a single handler invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("handler failed: {0}")]
    Failed(String),

    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Failure reported by an audit store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("audit record {0} already exists")]
    Duplicate(EventRecordId),

    #[error("audit record {0} not found")]
    NotFound(EventRecordId),

    #[error("audit store backend error: {0}")]
    Backend(String),
}

/// Why an execution unit did not finish cleanly.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// Nothing ran: the event left no trace, so its handlers were skipped.
    #[error("could not create audit record: {0}")]
    AuditCreate(#[source] StoreError),

    /// Handlers after `index` were skipped.
    #[error("handler #{index} aborted the chain: {source}")]
    Handler {
        index: usize,
        #[source]
        source: HandlerError,
    },

    /// Handlers already ran; their effects stay.
    #[error("could not finalize audit record: {0}")]
    AuditUpdate(#[source] StoreError),
}
