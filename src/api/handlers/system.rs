//! System endpoints: health check, resilience status and Prometheus
//! metrics.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::error::{CatalogError, ErrorResponse};
use crate::resilience::CircuitSnapshot;
use crate::sync::SyncStatsSnapshot;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service liveness, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "UP".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Circuit breaker and sync pipeline status.
#[derive(Debug, Serialize, ToSchema)]
struct StatusResponse {
    circuit_breaker: CircuitSnapshot,
    sync: SyncStatsSnapshot,
}

/// `GET /status` — Upstream breaker and event sync status.
#[utoipa::path(
    get,
    path = "/status",
    tag = "System",
    summary = "Resilience status",
    description = "Reports the upstream circuit breaker state and the event sync counters.",
    responses(
        (status = 200, description = "Current status", body = StatusResponse),
    )
)]
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(StatusResponse {
            circuit_breaker: state.breaker.snapshot(),
            sync: state.sync_stats.snapshot(),
        }),
    )
}

/// `GET /metrics` — Prometheus scrape endpoint.
///
/// # Errors
///
/// Returns [`CatalogError::Internal`] if the metrics cannot be encoded.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "System",
    summary = "Prometheus metrics",
    description = "Request counts and latency, consumed events by outcome, and the circuit breaker state gauge, in the Prometheus text format.",
    responses(
        (status = 200, description = "Metrics in text exposition format", body = String, content_type = "text/plain"),
        (status = 500, description = "Encoding failure", body = ErrorResponse),
    )
)]
pub async fn metrics_handler(State(state): State<AppState>) -> Result<impl IntoResponse, CatalogError> {
    state.metrics.set_circuit_state(state.breaker.get_state());
    let body = state
        .metrics
        .render()
        .map_err(|e| CatalogError::Internal(format!("failed to encode metrics: {e}")))?;
    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body))
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/metrics", get(metrics_handler))
}
