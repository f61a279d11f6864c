//! courier-core
//!
//! Process-wide event dispatcher for the forum backend.
//!
//! Producers publish [`Event`]s from any request context; handlers registered
//! per event name react to them on independent tasks, and every event leaves
//! one audit record behind.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, event, catalog, audit, errors）
//! - **ports**: 抽象化レイヤー（AuditStore, Handler, Clock, IdGenerator）
//! - **app**: dispatcher 本体（builder, dispatcher, registry, execution）
//! - **impls**: 実装（InMemoryAuditStore など開発用）
//! - **config**: 環境変数からの設定読み込み

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{Dispatcher, DispatcherBuilder, PublishError};
pub use config::DispatcherConfig;
pub use domain::{ActorId, AuditRecord, Event, HandlerError, Params, Signer, catalog};
pub use ports::{AuditStore, Handler, handler_fn};
