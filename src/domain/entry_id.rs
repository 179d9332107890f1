//! Identifier of a catalog item.
//!
//! The submission service mints the id when an item is first submitted.
//! The catalog only ever receives it in text form: as the `{id}` path
//! segment of a lookup, as the `id` field of an item event, or inside an
//! upstream payload. [`EntryId::parse`] is the single place that text is
//! validated, so the read path and the sync pipeline accept the same ids.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Key of a [`super::CatalogEntry`].
///
/// Primary key of the local store, lookup key for the submission service and
/// the value echoed back in API responses. Serializes as the canonical
/// hyphenated lowercase UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(uuid::Uuid);

impl EntryId {
    /// Fresh random id. Real ids come from upstream; this is for fixtures
    /// and for lookups that are expected to miss.
    #[must_use]
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Wraps an id already decoded by a trusted layer (database row,
    /// upstream payload).
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Parses a client- or event-supplied id.
    ///
    /// Surrounding whitespace is ignored. Any UUID spelling is accepted
    /// (hyphenated, simple, braced, `urn:uuid:`); [`fmt::Display`] always
    /// renders the hyphenated form, so differently spelled requests for the
    /// same item hit the same row.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`uuid::Error`] if `raw` is not a UUID.
    pub fn parse(raw: &str) -> Result<Self, uuid::Error> {
        uuid::Uuid::parse_str(raw.trim()).map(Self)
    }

    /// The UUID bound as the store's primary key.
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for EntryId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<EntryId> for uuid::Uuid {
    fn from(id: EntryId) -> Self {
        id.0
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    const ITEM: &str = "7c9e6679-7425-40de-944b-e07fc1f90ae7";

    fn parsed(raw: &str) -> EntryId {
        let Ok(id) = EntryId::parse(raw) else {
            panic!("{raw:?} rejected");
        };
        id
    }

    #[test]
    fn path_segment_round_trips_to_the_same_text() {
        assert_eq!(parsed(ITEM).to_string(), ITEM);
    }

    #[test]
    fn alternative_spellings_resolve_to_one_item() {
        let canonical = parsed(ITEM);
        for raw in [
            "7C9E6679-7425-40DE-944B-E07FC1F90AE7",
            "7c9e6679742540de944be07fc1f90ae7",
            "{7c9e6679-7425-40de-944b-e07fc1f90ae7}",
            "urn:uuid:7c9e6679-7425-40de-944b-e07fc1f90ae7",
            "  7c9e6679-7425-40de-944b-e07fc1f90ae7\n",
        ] {
            assert_eq!(parsed(raw), canonical, "{raw:?}");
            assert_eq!(parsed(raw).to_string(), ITEM);
        }
    }

    #[test]
    fn non_uuid_ids_are_rejected() {
        for raw in ["", "   ", "42", "paper-42", "7c9e6679-7425-40de-944b"] {
            assert!(EntryId::parse(raw).is_err(), "{raw:?}");
            assert!(raw.parse::<EntryId>().is_err(), "{raw:?}");
        }
    }

    #[test]
    fn event_id_field_deserializes_into_entry_id() {
        let Ok(id) = serde_json::from_value::<EntryId>(serde_json::json!(ITEM)) else {
            panic!("event id rejected");
        };
        assert_eq!(id, parsed(ITEM));
        assert!(serde_json::from_value::<EntryId>(serde_json::json!(42)).is_err());
    }

    #[test]
    fn response_id_is_the_bare_uuid() {
        let id = parsed(ITEM);
        assert_eq!(uuid::Uuid::from(id), *id.as_uuid());
        let json = serde_json::to_string(&id).ok();
        assert_eq!(json.as_deref(), Some("\"7c9e6679-7425-40de-944b-e07fc1f90ae7\""));
    }
}
