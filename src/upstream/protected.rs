//! Circuit-protected remote lookups with graceful degradation.

use std::sync::Arc;

use super::{FetchOutcome, UpstreamFailure, UpstreamSource};
use crate::domain::{CatalogEntry, EntryId};
use crate::resilience::{CallError, CircuitBreaker};

/// Detailed result of a protected lookup.
///
/// Callers of [`ProtectedRemoteClient::fetch_by_id`] only see found/absent;
/// this richer form keeps the rejection and failure cases apart for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteLookup {
    /// The upstream returned the item.
    Found(CatalogEntry),
    /// The upstream reported the item does not exist.
    Absent,
    /// The breaker was open; the upstream was not called.
    Rejected,
    /// The call failed or timed out and was counted against the breaker.
    Failed(String),
}

impl RemoteLookup {
    /// Collapses the lookup into "entry or nothing".
    #[must_use]
    pub fn into_entry(self) -> Option<CatalogEntry> {
        match self {
            Self::Found(entry) => Some(entry),
            Self::Absent | Self::Rejected | Self::Failed(_) => None,
        }
    }
}

/// Upstream client guarded by the shared [`CircuitBreaker`].
///
/// Only [`FetchOutcome::Failure`] is reported to the breaker as a failure;
/// a 404-style [`FetchOutcome::Absent`] is a successful call. No error ever
/// leaves this type: rejections and failures degrade to "no remote data".
#[derive(Debug, Clone)]
pub struct ProtectedRemoteClient {
    source: Arc<dyn UpstreamSource>,
    breaker: Arc<CircuitBreaker>,
}

impl ProtectedRemoteClient {
    /// Creates a client over `source`, guarded by `breaker`.
    #[must_use]
    pub fn new(source: Arc<dyn UpstreamSource>, breaker: Arc<CircuitBreaker>) -> Self {
        Self { source, breaker }
    }

    /// Returns the breaker guarding this client.
    #[must_use]
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Fetches an entry from the upstream, or `None` if it is absent or the
    /// upstream is unavailable.
    pub async fn fetch_by_id(&self, id: EntryId) -> Option<CatalogEntry> {
        self.lookup(id).await.into_entry()
    }

    /// Fetches an entry and reports exactly why none was returned.
    pub async fn lookup(&self, id: EntryId) -> RemoteLookup {
        match self.breaker.call(|| self.classified_fetch(id)).await {
            Ok(Some(entry)) => RemoteLookup::Found(entry),
            Ok(None) => {
                tracing::debug!(%id, "entry absent upstream");
                RemoteLookup::Absent
            }
            Err(CallError::Open) => {
                tracing::warn!(%id, "circuit breaker is OPEN, skipping upstream lookup");
                RemoteLookup::Rejected
            }
            Err(err) => {
                tracing::error!(%id, error = %err, "upstream lookup failed");
                RemoteLookup::Failed(err.to_string())
            }
        }
    }

    /// Maps the tagged outcome onto the breaker's success/failure channel.
    async fn classified_fetch(&self, id: EntryId) -> Result<Option<CatalogEntry>, UpstreamFailure> {
        match self.source.fetch(id).await {
            FetchOutcome::Found(entry) => Ok(Some(entry)),
            FetchOutcome::Absent => Ok(None),
            FetchOutcome::Failure(reason) => Err(reason),
        }
    }
}
