//! Domain model (ids, events, audit records, errors).
//!
//! - ids: 監査レコードの ULID ベース ID
//! - event: Event / Signer / Params
//! - catalog: forum 側が publish するイベントのファクトリ
//! - audit: AuditRecord / AuditCompletion
//! - errors: HandlerError / StoreError / ExecutionError

pub mod audit;
pub mod catalog;
pub mod errors;
pub mod event;
pub mod ids;

pub use self::audit::{AuditCompletion, AuditRecord};
pub use self::errors::{ExecutionError, HandlerError, StoreError};
pub use self::event::{ActorId, Event, Params, Signer};
pub use self::ids::{EventRecordId, Id, IdMarker};
