//! Request metrics layer.

use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::app_state::AppState;

/// Records count and latency of every routed request, labelled by the
/// route template rather than the raw path, then refreshes the breaker
/// state gauge.
pub async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path().to_string(), |path| path.as_str().to_string());

    let response = next.run(request).await;

    state
        .metrics
        .record_http_request(&method, &endpoint, response.status().as_u16(), start.elapsed());
    state.metrics.set_circuit_state(state.breaker.get_state());
    response
}
