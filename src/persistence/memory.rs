//! In-process catalog store.
//!
//! [`InMemoryCatalogStore`] keeps entries in a `HashMap` behind a
//! [`tokio::sync::RwLock`]. Used when persistence is disabled and as the
//! store in tests.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::CatalogStore;
use crate::domain::{CatalogEntry, EntryId};
use crate::error::CatalogError;

/// Catalog store backed by a locked `HashMap`.
///
/// # Concurrency
///
/// - Concurrent reads share the lock.
/// - Each upsert holds the write lock for the whole insert-or-update, so it
///   is atomic with respect to readers.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    entries: RwLock<HashMap<EntryId, CatalogEntry>>,
}

impl InMemoryCatalogStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns `true` if the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn get_by_id(&self, id: EntryId) -> Result<Option<CatalogEntry>, CatalogError> {
        Ok(self.entries.read().await.get(&id).cloned())
    }

    async fn upsert(&self, entry: &CatalogEntry) -> Result<(), CatalogError> {
        let mut incoming = entry.clone();
        incoming.synced_at.get_or_insert_with(Utc::now);

        let mut map = self.entries.write().await;
        match map.entry(entry.id) {
            Entry::Occupied(mut slot) => slot.get_mut().merge_from(&incoming),
            Entry::Vacant(slot) => {
                slot.insert(incoming);
            }
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        let map = self.entries.read().await;
        let mut entries: Vec<CatalogEntry> = map.values().cloned().collect();
        entries.sort_by(|a, b| b.synced_at.cmp(&a.synced_at));
        Ok(entries)
    }
}
