//! Catalog read path: local store first, circuit-protected upstream second.

use std::sync::Arc;

use crate::domain::{CatalogEntry, EntryId, Provenance, ResolvedEntry};
use crate::error::CatalogError;
use crate::persistence::CatalogStore;
use crate::upstream::ProtectedRemoteClient;

/// Read-through lookups over the local store with a remote fallback.
///
/// Remote hits are returned to the caller but not written back to the
/// local store; the sync pipeline is the only writer.
#[derive(Debug, Clone)]
pub struct CatalogReadPath {
    store: Arc<dyn CatalogStore>,
    remote: Arc<ProtectedRemoteClient>,
}

impl CatalogReadPath {
    /// Creates a read path over `store` falling back to `remote`.
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>, remote: Arc<ProtectedRemoteClient>) -> Self {
        Self { store, remote }
    }

    /// Returns the remote client used on local misses.
    #[must_use]
    pub fn remote(&self) -> &Arc<ProtectedRemoteClient> {
        &self.remote
    }

    /// Resolves an entry from its textual identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidRequest`] if `raw_id` is not a valid
    /// identifier (no lookup is attempted), and otherwise the errors of
    /// [`CatalogReadPath::get_by_id`].
    pub async fn get(&self, raw_id: &str) -> Result<ResolvedEntry, CatalogError> {
        let id = EntryId::parse(raw_id)
            .map_err(|_| CatalogError::InvalidRequest("invalid entry id format".to_string()))?;
        self.get_by_id(id).await
    }

    /// Resolves an entry, tagging where it came from.
    ///
    /// An open circuit or failing upstream is indistinguishable from a
    /// genuine absence here: both yield [`CatalogError::EntryNotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::EntryNotFound`] if neither side has the
    /// entry, and [`CatalogError::PersistenceError`] if the local lookup
    /// fails.
    pub async fn get_by_id(&self, id: EntryId) -> Result<ResolvedEntry, CatalogError> {
        if let Some(entry) = self.store.get_by_id(id).await? {
            return Ok(ResolvedEntry {
                entry,
                provenance: Provenance::Local,
            });
        }

        tracing::debug!(%id, "local miss, falling back to upstream");
        match self.remote.fetch_by_id(id).await {
            Some(entry) => Ok(ResolvedEntry {
                entry,
                provenance: Provenance::Remote,
            }),
            None => Err(CatalogError::EntryNotFound(*id.as_uuid())),
        }
    }

    /// Lists every locally stored entry, most recently synced first.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::PersistenceError`] on store failure.
    pub async fn list(&self) -> Result<Vec<CatalogEntry>, CatalogError> {
        self.store.list().await
    }
}
