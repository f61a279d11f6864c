//! ExecutionUnit - 1 イベント分の handler チェーンを隔離して実行
//!
//! # フロー
//! 1. AuditStore::insert() で "started" レコードを作成（失敗したら handler は実行しない）
//! 2. handler を登録順に実行。Err か panic で残りを打ち切る
//! 3. AuditStore::update_by_id() で finished_at / elapsed / handler_count を記録
//!
//! どの失敗もここで止まり、dispatch loop や他のイベントには伝播しません。

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::domain::{
    AuditCompletion, AuditRecord, Event, EventRecordId, ExecutionError, HandlerError,
};
use crate::ports::{AuditStore, Clock, Handler};

/// What a finished unit reports back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSummary {
    pub record_id: EventRecordId,
    /// Handlers matched at dispatch time. All of them ran.
    pub handler_count: usize,
}

pub struct ExecutionUnit {
    record_id: EventRecordId,
    event: Event,
    handlers: Vec<Arc<dyn Handler>>,
    store: Arc<dyn AuditStore>,
    clock: Arc<dyn Clock>,
}

impl ExecutionUnit {
    pub fn new(
        record_id: EventRecordId,
        event: Event,
        handlers: Vec<Arc<dyn Handler>>,
        store: Arc<dyn AuditStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            record_id,
            event,
            handlers,
            store,
            clock,
        }
    }

    /// Runs the unit on its own task. The handle is only useful to tests;
    /// the dispatch loop drops it.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let record_id = self.record_id;
            let name = self.event.name().to_string();

            match self.run().await {
                Ok(summary) => debug!(
                    event = %name,
                    record_id = %record_id,
                    handlers = summary.handler_count,
                    "event dispatched"
                ),
                Err(err) => error!(
                    event = %name,
                    record_id = %record_id,
                    error = %err,
                    "event dispatch failed"
                ),
            }
        })
    }

    pub async fn run(self) -> Result<ExecutionSummary, ExecutionError> {
        let record = AuditRecord::started(self.record_id, &self.event, self.clock.now());
        self.store
            .insert(&record)
            .await
            .map_err(ExecutionError::AuditCreate)?;

        let started = Instant::now();
        let handler_count = self.handlers.len();
        let chain = run_chain(&self.handlers, &self.event).await;

        let completion = AuditCompletion {
            finished_at: self.clock.now(),
            elapsed: started.elapsed(),
            handler_count,
        };
        let update = self.store.update_by_id(self.record_id, &completion).await;

        match (chain, update) {
            (Ok(()), Ok(())) => Ok(ExecutionSummary {
                record_id: self.record_id,
                handler_count,
            }),
            (Ok(_), Err(err)) => Err(ExecutionError::AuditUpdate(err)),
            (Err(failure), update) => {
                if let Err(err) = update {
                    error!(
                        event = %self.event.name(),
                        record_id = %self.record_id,
                        error = %err,
                        "could not finalize audit record after handler failure"
                    );
                }
                Err(failure)
            }
        }
    }
}

/// Runs handlers in order, stopping at the first failure.
async fn run_chain(handlers: &[Arc<dyn Handler>], event: &Event) -> Result<(), ExecutionError> {
    for (index, handler) in handlers.iter().enumerate() {
        invoke(handler.as_ref(), event)
            .await
            .map_err(|source| ExecutionError::Handler { index, source })?;
    }
    Ok(())
}

/// `handle()` is called inside the guarded future, so a panic while the
/// handler builds its future is caught as well as one raised while polling.
async fn invoke(handler: &dyn Handler, event: &Event) -> Result<(), HandlerError> {
    let call = async move { handler.handle(event).await };
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(HandlerError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
