//! The local store seam used by the read path and the sync pipeline.

use std::fmt;

use async_trait::async_trait;

use crate::domain::{CatalogEntry, EntryId};
use crate::error::CatalogError;

/// Materialized catalog store.
///
/// Implementations provide per-operation atomicity; no operation here
/// spans more than one statement.
#[async_trait]
pub trait CatalogStore: Send + Sync + fmt::Debug {
    /// Looks up a single entry.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::PersistenceError`] on store failure.
    async fn get_by_id(&self, id: EntryId) -> Result<Option<CatalogEntry>, CatalogError>;

    /// Inserts `entry`, or updates the existing row with the same id.
    ///
    /// On update, title, author, abstract, status and `synced_at` are
    /// replaced; `created_at` keeps its first value. Applying the same entry
    /// twice leaves the store as applying it once (modulo `synced_at`).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::PersistenceError`] on store failure.
    async fn upsert(&self, entry: &CatalogEntry) -> Result<(), CatalogError>;

    /// Returns every stored entry, most recently synced first.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::PersistenceError`] on store failure.
    async fn list(&self) -> Result<Vec<CatalogEntry>, CatalogError>;
}
