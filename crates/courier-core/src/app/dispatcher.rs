//! Dispatcher - publish / register の受付と dispatch loop
//!
//! # 構成
//! - **Dispatcher**: producer が持つハンドル（clone 可能）。2 本の bounded channel の送信側
//! - **DispatchLoop**: 両 channel の唯一の受信者で、HandlerRegistry の唯一の所有者
//!
//! loop 自身は handler を実行しません。イベントごとに snapshot を取り、
//! ExecutionUnit を spawn して待たずに次へ進みます。

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::execution::ExecutionUnit;
use super::registry::HandlerRegistry;
use crate::domain::Event;
use crate::ports::{AuditStore, Clock, Handler, IdGenerator};

/// Returned by [`Dispatcher::try_publish`]; hands the event back.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("publish queue is full")]
    Full(Event),

    #[error("dispatch loop has stopped")]
    Closed(Event),
}

impl PublishError {
    pub fn into_event(self) -> Event {
        match self {
            PublishError::Full(event) | PublishError::Closed(event) => event,
        }
    }
}

pub(crate) struct Registration {
    event_name: String,
    handler: Arc<dyn Handler>,
    applied: oneshot::Sender<()>,
}

/// Producer-side handle. Cheap to clone; pass it to request handlers.
///
/// The dispatch loop keeps running while at least one handle is alive.
#[derive(Clone)]
pub struct Dispatcher {
    events: mpsc::Sender<Event>,
    registrations: mpsc::Sender<Registration>,
}

impl Dispatcher {
    pub(crate) fn new(
        events: mpsc::Sender<Event>,
        registrations: mpsc::Sender<Registration>,
    ) -> Self {
        Self {
            events,
            registrations,
        }
    }

    /// Queues an event. Waits only while the publish queue is full.
    pub async fn publish(&self, event: Event) {
        if let Err(mpsc::error::SendError(event)) = self.events.send(event).await {
            warn!(event = %event.name(), "dispatch loop has stopped; event dropped");
        }
    }

    /// Same as [`publish`](Self::publish), for code outside the runtime.
    ///
    /// Panics when called from within an async context, like
    /// `tokio::sync::mpsc::Sender::blocking_send`.
    pub fn blocking_publish(&self, event: Event) {
        if let Err(mpsc::error::SendError(event)) = self.events.blocking_send(event) {
            warn!(event = %event.name(), "dispatch loop has stopped; event dropped");
        }
    }

    /// Never waits.
    pub fn try_publish(&self, event: Event) -> Result<(), PublishError> {
        self.events.try_send(event).map_err(|err| match err {
            mpsc::error::TrySendError::Full(event) => PublishError::Full(event),
            mpsc::error::TrySendError::Closed(event) => PublishError::Closed(event),
        })
    }

    /// Appends `handler` to `event_name`'s chain.
    ///
    /// Resolves once the loop has applied the registration, so any event the
    /// caller publishes afterwards sees it.
    pub async fn register<H: Handler + 'static>(&self, event_name: impl Into<String>, handler: H) {
        self.register_shared(event_name, Arc::new(handler)).await;
    }

    pub async fn register_shared(&self, event_name: impl Into<String>, handler: Arc<dyn Handler>) {
        let (applied, ack) = oneshot::channel();
        let registration = Registration {
            event_name: event_name.into(),
            handler,
            applied,
        };
        if let Err(mpsc::error::SendError(registration)) =
            self.registrations.send(registration).await
        {
            warn!(
                event = %registration.event_name,
                "dispatch loop has stopped; registration dropped"
            );
            return;
        }
        // The loop acks right after mutating the registry.
        if ack.await.is_err() {
            warn!("dispatch loop stopped before acknowledging a registration");
        }
    }
}

/// Single owner of the registry and sole reader of both intake queues.
pub(crate) struct DispatchLoop {
    registry: HandlerRegistry,
    events: mpsc::Receiver<Event>,
    registrations: mpsc::Receiver<Registration>,
    store: Arc<dyn AuditStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl DispatchLoop {
    pub(crate) fn new(
        registry: HandlerRegistry,
        events: mpsc::Receiver<Event>,
        registrations: mpsc::Receiver<Registration>,
        store: Arc<dyn AuditStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            registry,
            events,
            registrations,
            store,
            clock,
            ids,
        }
    }

    /// Runs until every [`Dispatcher`] handle is dropped. Units already
    /// spawned are not waited for.
    pub(crate) async fn run(mut self) {
        debug!(
            handlers = self.registry.len(),
            events = ?self.registry.event_names(),
            "dispatch loop started"
        );
        loop {
            tokio::select! {
                Some(event) = self.events.recv() => self.dispatch(event),
                Some(registration) = self.registrations.recv() => self.apply(registration),
                else => break,
            }
        }
        debug!("dispatch loop stopped");
    }

    fn dispatch(&self, event: Event) {
        let record_id = self.ids.generate_event_record_id();
        let handlers = self.registry.snapshot(event.name());
        debug!(
            event = %event.name(),
            record_id = %record_id,
            handlers = handlers.len(),
            "dispatching event"
        );

        // Dropping the handle detaches the unit.
        drop(
            ExecutionUnit::new(
                record_id,
                event,
                handlers,
                Arc::clone(&self.store),
                Arc::clone(&self.clock),
            )
            .spawn(),
        );
    }

    fn apply(&mut self, registration: Registration) {
        let Registration {
            event_name,
            handler,
            applied,
        } = registration;
        self.registry.register(event_name.clone(), handler);
        debug!(
            event = %event_name,
            handlers = self.registry.handler_count(&event_name),
            "handler registered"
        );
        // The registrant may have given up waiting; that is fine.
        let _ = applied.send(());
    }
}
