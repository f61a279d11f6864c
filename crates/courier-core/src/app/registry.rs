//! HandlerRegistry - イベント名ごとの handler 一覧
//!
//! dispatch loop だけが所有・変更するので lock は持ちません。
//! 登録は追記のみで、削除や並べ替えはありません。

use std::collections::HashMap;
use std::sync::Arc;

use crate::ports::Handler;

/// Registry of handlers (event name -> handlers in registration order).
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Vec<Arc<dyn Handler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Appends `handler` to the list for `event_name`, creating the list on
    /// first use.
    pub fn register(&mut self, event_name: impl Into<String>, handler: Arc<dyn Handler>) {
        self.handlers
            .entry(event_name.into())
            .or_default()
            .push(handler);
    }

    /// Copy of the current list. Later registrations do not show up in it.
    pub fn snapshot(&self, event_name: &str) -> Vec<Arc<dyn Handler>> {
        self.handlers.get(event_name).cloned().unwrap_or_default()
    }

    pub fn handler_count(&self, event_name: &str) -> usize {
        self.handlers.get(event_name).map_or(0, Vec::len)
    }

    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
