//! InMemoryAuditStore - 開発用の監査ストア
//!
//! # 実装詳細
//! - HashMap<EventRecordId, AuditRecord> を Mutex で保護
//! - 挿入順を Vec で保持（records() は発行順に返す）
//! - lock を await を跨いで保持しないので std::sync::Mutex で十分

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::{AuditCompletion, AuditRecord, EventRecordId, StoreError};
use crate::ports::AuditStore;

#[derive(Default)]
struct State {
    records: HashMap<EventRecordId, AuditRecord>,
    order: Vec<EventRecordId>,
}

/// InMemoryAuditStore は clone しても同じ中身を共有する
///
/// # 使用例
/// ```ignore
/// let store = InMemoryAuditStore::new();
/// let (dispatcher, _loop) = DispatcherBuilder::new().spawn(store.clone())?;
/// dispatcher.publish(Event::new("vote")).await;
/// // ...
/// assert_eq!(store.finished_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryAuditStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, id: EventRecordId) -> Option<AuditRecord> {
        self.state().records.get(&id).cloned()
    }

    /// All records in insertion order.
    pub fn records(&self) -> Vec<AuditRecord> {
        let state = self.state();
        state
            .order
            .iter()
            .filter_map(|id| state.records.get(id).cloned())
            .collect()
    }

    pub fn find_by_name(&self, name: &str) -> Vec<AuditRecord> {
        self.records()
            .into_iter()
            .filter(|record| record.name == name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().order.is_empty()
    }

    pub fn finished_count(&self) -> usize {
        self.state()
            .records
            .values()
            .filter(|record| record.is_finished())
            .count()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn insert(&self, record: &AuditRecord) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.records.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id));
        }
        state.order.push(record.id);
        state.records.insert(record.id, record.clone());
        Ok(())
    }

    async fn update_by_id(
        &self,
        id: EventRecordId,
        completion: &AuditCompletion,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        let record = state.records.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        record.apply(completion);
        Ok(())
    }
}
