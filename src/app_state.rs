//! Shared application state injected into all Axum handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::metrics::CatalogMetrics;
use crate::resilience::CircuitBreaker;
use crate::service::CatalogReadPath;
use crate::sync::{InMemoryEventStream, SyncStats};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Read path for catalog lookups.
    pub read_path: Arc<CatalogReadPath>,
    /// Breaker guarding the upstream, for status reporting.
    pub breaker: Arc<CircuitBreaker>,
    /// In-process event stream accepting ingested events.
    pub events: InMemoryEventStream,
    /// Topic ingested events are published to.
    pub event_topic: String,
    /// How long an ingestion request waits for room on a full topic.
    pub event_publish_timeout: Duration,
    /// Sync pipeline counters, for status reporting.
    pub sync_stats: Arc<SyncStats>,
    /// Prometheus registry behind `/metrics`.
    pub metrics: Arc<CatalogMetrics>,
}
