//! Domain layer: catalog identity, entries, and stream events.
//!
//! This module contains the catalog's domain model: the typed entry
//! identifier, the materialized entry with its provenance tag, and the
//! item events that keep the local store warm.

pub mod catalog_entry;
pub mod entry_id;
pub mod item_event;

pub use catalog_entry::{CatalogEntry, Provenance, ResolvedEntry};
pub use entry_id::EntryId;
pub use item_event::{EventError, ItemEvent};
