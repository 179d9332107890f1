//! Item creation/update events consumed from the submission event stream.
//!
//! Events arrive as opaque JSON records. [`ItemEvent`] captures the fields
//! the catalog cares about and [`ItemEvent::into_entry`] turns one into the
//! [`CatalogEntry`] that gets upserted.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use super::{CatalogEntry, EntryId};

/// Status recorded when an event carries none.
pub const DEFAULT_STATUS: &str = "SUBMITTED";

/// Reasons a single event cannot be applied.
///
/// These are per-event errors: the sync pipeline logs them and moves on.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// Payload is not an object with the required fields.
    #[error("malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// `id` is present but not a valid identifier.
    #[error("invalid event id {raw:?}: {source}")]
    InvalidId {
        /// The offending value.
        raw: String,
        /// Parse failure.
        source: uuid::Error,
    },

    /// A required text field is empty.
    #[error("event field `{0}` must not be empty")]
    EmptyField(&'static str),
}

/// Wire shape of an item event.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemEvent {
    /// Item identifier, still in textual form.
    pub id: String,
    /// Item title.
    pub title: String,
    /// Item author.
    pub author: String,
    /// Optional abstract.
    #[serde(default, rename = "abstractText")]
    pub abstract_text: Option<String>,
    /// Optional status token.
    #[serde(default)]
    pub status: Option<String>,
    /// Optional ISO-8601 creation time.
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<String>,
}

impl ItemEvent {
    /// Decodes an event from a raw stream payload.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::Malformed`] if required fields are missing or
    /// have the wrong type.
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self, EventError> {
        Ok(Self::deserialize(payload)?)
    }

    /// Validates the event and builds the entry to upsert.
    ///
    /// `ingested_at` becomes `synced_at`, and also `created_at` when the
    /// event has no usable `createdAt`. A missing abstract becomes an empty
    /// string and a missing status becomes [`DEFAULT_STATUS`].
    ///
    /// # Errors
    ///
    /// Returns [`EventError::InvalidId`] for an unparseable `id` and
    /// [`EventError::EmptyField`] for a blank title or author.
    pub fn into_entry(self, ingested_at: DateTime<Utc>) -> Result<CatalogEntry, EventError> {
        let id = EntryId::parse(&self.id).map_err(|source| EventError::InvalidId {
            raw: self.id.clone(),
            source,
        })?;
        require_text(&self.title, &self.author)?;

        let created_at = self
            .created_at
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or(ingested_at);

        Ok(CatalogEntry {
            id,
            title: self.title,
            author: self.author,
            abstract_text: Some(self.abstract_text.unwrap_or_default()),
            status: Some(self.status.unwrap_or_else(|| DEFAULT_STATUS.to_string())),
            created_at: Some(created_at),
            synced_at: Some(ingested_at),
        })
    }
}

/// Rejects a blank (empty or whitespace-only) title or author.
///
/// Shared by every path that turns an external payload into a
/// [`CatalogEntry`].
///
/// # Errors
///
/// Returns [`EventError::EmptyField`] naming the first blank field.
pub fn require_text(title: &str, author: &str) -> Result<(), EventError> {
    if title.trim().is_empty() {
        return Err(EventError::EmptyField("title"));
    }
    if author.trim().is_empty() {
        return Err(EventError::EmptyField("author"));
    }
    Ok(())
}

/// Parses an ISO-8601 timestamp.
///
/// Offset-qualified values (including a trailing `Z`) are converted to UTC;
/// values without an offset are taken as UTC. Returns `None` for anything
/// else.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
