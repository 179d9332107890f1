//! Prometheus metrics served at `/metrics`.
//!
//! [`CatalogMetrics`] owns its own [`Registry`] so every service instance
//! (and every test) starts from a clean set. HTTP request metrics and the
//! circuit breaker gauge live here; the sync pipeline counters live in
//! [`crate::sync::SyncStats`] and are registered into the same registry.

use std::fmt;
use std::time::Duration;

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

use crate::resilience::CircuitState;

/// HTTP latency buckets (seconds).
const HTTP_LATENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0];

/// Registry plus the service-level metrics.
#[derive(Clone)]
pub struct CatalogMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
    circuit_breaker_state: IntGauge,
}

impl CatalogMetrics {
    /// Creates a registry with the HTTP and breaker metrics registered.
    ///
    /// # Errors
    ///
    /// Returns a [`prometheus::Error`] if a metric cannot be created or
    /// registered.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("catalog_requests_total", "Total HTTP requests"),
            &["method", "endpoint", "status"],
        )?;
        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("catalog_request_duration_seconds", "HTTP request latency in seconds")
                .buckets(HTTP_LATENCY_BUCKETS.to_vec()),
            &["method", "endpoint"],
        )?;
        let circuit_breaker_state = IntGauge::new(
            "catalog_circuit_breaker_state",
            "Circuit breaker state (0=closed, 1=open, 2=half-open)",
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration_seconds,
            circuit_breaker_state,
        })
    }

    /// The registry further collectors are registered into.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Records one finished HTTP request.
    pub fn record_http_request(&self, method: &str, endpoint: &str, status: u16, duration: Duration) {
        self.requests_total
            .with_label_values(&[method, endpoint, &status.to_string()])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[method, endpoint])
            .observe(duration.as_secs_f64());
    }

    /// Publishes the current breaker state.
    pub fn set_circuit_state(&self, state: CircuitState) {
        self.circuit_breaker_state.set(i64::from(state.as_gauge()));
    }

    /// Encodes every registered metric in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns a [`prometheus::Error`] if encoding fails.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl fmt::Debug for CatalogMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogMetrics")
            .field("circuit_breaker_state", &self.circuit_breaker_state.get())
            .finish_non_exhaustive()
    }
}
