//! Durable storage for state records.
//!
//! A store maps `(collection_id, item_id)` to a [`StateRecord`]. No locking
//! is performed: the store assumes a single writer per key per process and
//! concurrent writers get last-write-wins semantics.

mod file;
mod memory;

use async_trait::async_trait;

use crate::core::StateRecord;
use crate::errors::StoreError;

pub(crate) use file::escape_id;
pub use file::JsonFileStateStore;
pub use memory::InMemoryStateStore;

/// Storage backend for state records.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the record for a key.
    ///
    /// Corrupt or unreadable content is logged and reported as absent.
    async fn load(&self, collection_id: &str, item_id: &str) -> Option<StateRecord>;

    /// Persists the full record, refreshing its timestamp first.
    ///
    /// The caller keeps its in-memory record whether or not this succeeds.
    async fn save(&self, state: &mut StateRecord) -> Result<(), StoreError>;

    /// Returns the stored record, or a fresh one with every phase pending.
    ///
    /// A fresh record is not persisted until the first [`save`](Self::save).
    async fn initialize_or_resume(&self, collection_id: &str, item_id: &str) -> StateRecord {
        match self.load(collection_id, item_id).await {
            Some(state) => state,
            None => StateRecord::new(collection_id, item_id),
        }
    }
}
