//! Event-driven synchronization of the local store.
//!
//! The [`EventStream`]/[`Subscription`] traits describe the stream boundary.
//! [`InMemoryEventStream`] is the in-process implementation the service
//! runs with, and [`EventSyncPipeline`] is the consumer that applies item
//! events to the [`crate::persistence::CatalogStore`].

pub mod memory;
pub mod pipeline;
pub mod stats;
pub mod stream;

pub use memory::InMemoryEventStream;
pub use pipeline::{ApplyError, EventSyncPipeline};
pub use stats::{SyncStats, SyncStatsSnapshot};
pub use stream::{EventStream, StreamError, StreamRecord, Subscription};
