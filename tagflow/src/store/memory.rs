//! In-memory state store.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::StateStore;
use crate::core::StateRecord;
use crate::errors::StoreError;

type Key = (String, String);

/// State store kept in process memory. Used by tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStateStore {
    records: Arc<Mutex<HashMap<Key, StateRecord>>>,
    save_count: Arc<Mutex<usize>>,
}

impl InMemoryStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Returns true if nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Number of successful saves since creation.
    #[must_use]
    pub fn save_count(&self) -> usize {
        *self.save_count.lock()
    }

    /// Inserts a record as-is, without touching its timestamp.
    pub fn insert(&self, state: StateRecord) {
        let key = (state.collection_id().to_string(), state.item_id().to_string());
        self.records.lock().insert(key, state);
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self, collection_id: &str, item_id: &str) -> Option<StateRecord> {
        self.records
            .lock()
            .get(&(collection_id.to_string(), item_id.to_string()))
            .cloned()
    }

    async fn save(&self, state: &mut StateRecord) -> Result<(), StoreError> {
        state.touch();
        self.insert(state.clone());
        *self.save_count.lock() += 1;
        Ok(())
    }
}
