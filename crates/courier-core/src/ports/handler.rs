//! Handler trait - イベントに反応する処理の定義
//!
//! # 二層構造
//! - **trait 実装**: 状態を持つ handler（カウンタ、通知クライアントなど）
//! - **handler_fn**: `Fn(Event) -> Future` のクロージャをそのまま登録

use async_trait::async_trait;
use std::future::Future;

use crate::domain::{Event, HandlerError};

/// Handler は 1 つのイベント名に登録され、そのイベントごとに呼ばれる
///
/// # 使用例
/// ```ignore
/// struct Reputation;
///
/// #[async_trait]
/// impl Handler for Reputation {
///     async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
///         bump(event.signer()).await.map_err(|e| HandlerError::failed(e.to_string()))
///     }
/// }
/// ```
///
/// `Err` を返すと、同じイベントに対する後続の handler は実行されません。
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, event: &Event) -> Result<(), HandlerError>;
}

/// Adapter produced by [`handler_fn`].
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, event: &Event) -> Result<(), HandlerError> {
        (self.f)(event.clone()).await
    }
}

/// Wraps an async closure taking the event by value.
///
/// ```ignore
/// dispatcher.register("vote", handler_fn(|event| async move {
///     tracing::info!(name = event.name(), "got a vote");
///     Ok(())
/// })).await;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Event) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    FnHandler { f }
}
