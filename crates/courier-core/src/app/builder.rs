//! DispatcherBuilder - dispatcher の構築とワイヤリング
//!
//! プロセス起動時に一度だけ使います。`on()` で登録した handler は
//! loop が動き出す前に registry に入るので、最初のイベントから有効です。

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::dispatcher::{DispatchLoop, Dispatcher};
use super::registry::HandlerRegistry;
use crate::config::{ConfigError, DispatcherConfig};
use crate::ports::{AuditStore, Clock, Handler, IdGenerator, SystemClock, UlidGenerator};

/// DispatcherBuilder は dispatcher を構築
///
/// # 使用例
/// ```ignore
/// let (dispatcher, dispatch_loop) = DispatcherBuilder::new()
///     .config(DispatcherConfig::from_env()?)
///     .on(catalog::VOTE_CAST, Reputation::new(db.clone()))
///     .on(catalog::FLAG_RAISED, Moderation::new(db.clone()))
///     .spawn(audit_store)?;
/// ```
pub struct DispatcherBuilder {
    config: DispatcherConfig,
    clock: Arc<dyn Clock>,
    ids: Option<Arc<dyn IdGenerator>>,
    registry: HandlerRegistry,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            config: DispatcherConfig::default(),
            clock: Arc::new(SystemClock),
            ids: None,
            registry: HandlerRegistry::new(),
        }
    }

    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Defaults to a [`UlidGenerator`] driven by the builder's clock.
    pub fn id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Some(Arc::new(ids));
        self
    }

    /// Registers a handler before the loop starts. Order of calls is the
    /// order of execution.
    pub fn on<H: Handler + 'static>(mut self, event_name: impl Into<String>, handler: H) -> Self {
        self.registry.register(event_name, Arc::new(handler));
        self
    }

    /// Starts the dispatch loop on the current tokio runtime.
    ///
    /// The returned handle finishes once every `Dispatcher` clone is dropped.
    pub fn spawn(
        self,
        store: impl AuditStore + 'static,
    ) -> Result<(Dispatcher, JoinHandle<()>), ConfigError> {
        self.config.validate()?;

        let ids: Arc<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Arc::new(UlidGenerator::new(Arc::clone(&self.clock))),
        };
        let (event_tx, event_rx) = mpsc::channel(self.config.publish_capacity);
        let (registration_tx, registration_rx) = mpsc::channel(self.config.register_capacity);

        let dispatch_loop = DispatchLoop::new(
            self.registry,
            event_rx,
            registration_rx,
            Arc::new(store),
            self.clock,
            ids,
        );
        let handle = tokio::spawn(dispatch_loop.run());

        Ok((Dispatcher::new(event_tx, registration_tx), handle))
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
