//! Catalog entry DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{CatalogEntry, Provenance, ResolvedEntry};

/// A catalog entry as returned by the catalog endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct CatalogEntryDto {
    /// Entry identifier.
    pub id: uuid::Uuid,
    /// Item title.
    pub title: String,
    /// Item author.
    pub author: String,
    /// Abstract text, if any.
    pub abstract_text: Option<String>,
    /// Status token.
    pub status: Option<String>,
    /// Upstream creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Last local write (absent for upstream-sourced entries).
    pub synced_at: Option<DateTime<Utc>>,
    /// `"local_db"` or `"submission_service"`.
    pub source: String,
}

impl CatalogEntryDto {
    /// Builds the DTO for `entry` served from `provenance`.
    #[must_use]
    pub fn new(entry: CatalogEntry, provenance: Provenance) -> Self {
        Self {
            id: entry.id.into(),
            title: entry.title,
            author: entry.author,
            abstract_text: entry.abstract_text,
            status: entry.status,
            created_at: entry.created_at,
            synced_at: entry.synced_at,
            source: provenance.as_str().to_string(),
        }
    }
}

impl From<ResolvedEntry> for CatalogEntryDto {
    fn from(resolved: ResolvedEntry) -> Self {
        Self::new(resolved.entry, resolved.provenance)
    }
}

/// Response body for `POST /internal/events` (202 Accepted).
#[derive(Debug, Serialize, ToSchema)]
pub struct PublishEventResponse {
    /// Topic the event was published to.
    pub topic: String,
    /// Offset assigned to the event.
    pub offset: u64,
}
