//! Catalog entry: the locally materialized view of an upstream item.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EntryId;

/// One catalog record per distinct item identifier.
///
/// `id` never changes. `title`, `author`, `abstract_text` and `status` are
/// last-write-wins. `created_at` is set once, on the first write, and is
/// never overwritten by later upserts; `synced_at` is refreshed by every
/// local write. Entries fetched from the upstream service and never stored
/// locally carry no `synced_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Primary key.
    pub id: EntryId,
    /// Item title.
    pub title: String,
    /// Item author.
    pub author: String,
    /// Optional abstract text.
    pub abstract_text: Option<String>,
    /// Short status token (e.g. `"SUBMITTED"`).
    pub status: Option<String>,
    /// Original upstream creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Time of the most recent local write.
    pub synced_at: Option<DateTime<Utc>>,
}

impl CatalogEntry {
    /// Applies a newer version of the same entry on top of `self`.
    ///
    /// Mutable fields are replaced and `synced_at` is refreshed; `id` and
    /// `created_at` are kept. This is the in-place half of an upsert.
    pub fn merge_from(&mut self, newer: &Self) {
        self.title.clone_from(&newer.title);
        self.author.clone_from(&newer.author);
        self.abstract_text.clone_from(&newer.abstract_text);
        self.status.clone_from(&newer.status);
        self.synced_at = newer.synced_at;
        if self.created_at.is_none() {
            self.created_at = newer.created_at;
        }
    }
}

/// Where a resolved entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    /// Served from the local materialized store.
    #[serde(rename = "local_db")]
    Local,
    /// Served by the upstream submission service through the circuit breaker.
    #[serde(rename = "submission_service")]
    Remote,
}

impl Provenance {
    /// Wire token used in API responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local_db",
            Self::Remote => "submission_service",
        }
    }
}

/// An entry tagged with its [`Provenance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    /// The entry itself.
    pub entry: CatalogEntry,
    /// Which side of the read path produced it.
    pub provenance: Provenance,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(title: &str) -> CatalogEntry {
        CatalogEntry {
            id: EntryId::from_uuid(uuid::Uuid::nil()),
            title: title.to_string(),
            author: "B".to_string(),
            abstract_text: None,
            status: Some("SUBMITTED".to_string()),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single(),
            synced_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 1).single(),
        }
    }

    #[test]
    fn merge_keeps_created_at_and_refreshes_synced_at() {
        let mut current = entry("A");
        let mut newer = entry("A2");
        newer.created_at = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).single();
        newer.synced_at = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).single();
        newer.status = Some("ACCEPTED".to_string());

        current.merge_from(&newer);

        assert_eq!(current.title, "A2");
        assert_eq!(current.status.as_deref(), Some("ACCEPTED"));
        assert_eq!(current.created_at, entry("A").created_at);
        assert_eq!(current.synced_at, newer.synced_at);
    }

    #[test]
    fn provenance_wire_tokens() {
        assert_eq!(Provenance::Local.as_str(), "local_db");
        assert_eq!(Provenance::Remote.as_str(), "submission_service");
        let json = serde_json::to_string(&Provenance::Remote).ok();
        assert_eq!(json.as_deref(), Some("\"submission_service\""));
    }
}
