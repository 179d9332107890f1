//! Event ingestion handler feeding the in-process event stream.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::PublishEventResponse;
use crate::app_state::AppState;
use crate::error::{CatalogError, ErrorResponse};

/// `POST /internal/events` — Publish an item event to the sync topic.
///
/// The payload is forwarded as-is; validation happens in the sync
/// pipeline, which logs and skips malformed events. A 202 means the event
/// is retained until the pipeline commits it.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidRequest`] if the body is not a JSON
/// object, and [`CatalogError::StreamUnavailable`] if the stream is shut
/// down or the topic stays full for the publish timeout.
#[utoipa::path(
    post,
    path = "/api/v1/internal/events",
    tag = "Events",
    summary = "Publish an item event",
    description = "Publishes a raw item creation/update event to the configured topic. The sync pipeline applies it asynchronously.",
    request_body(content = Object, description = "Raw item event", content_type = "application/json"),
    responses(
        (status = 202, description = "Event accepted", body = PublishEventResponse),
        (status = 400, description = "Body is not a JSON object", body = ErrorResponse),
        (status = 503, description = "Event stream shut down or topic full", body = ErrorResponse),
    )
)]
pub async fn publish_event(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> Result<impl IntoResponse, CatalogError> {
    if !payload.is_object() {
        return Err(CatalogError::InvalidRequest(
            "event payload must be a JSON object".to_string(),
        ));
    }

    let publish = state.events.publish(&state.event_topic, payload);
    let offset = tokio::time::timeout(state.event_publish_timeout, publish)
        .await
        .map_err(|_| {
            tracing::warn!(topic = %state.event_topic, "event topic full, publish timed out");
            CatalogError::StreamUnavailable("event topic is full".to_string())
        })?
        .map_err(|e| CatalogError::StreamUnavailable(e.to_string()))?;

    tracing::debug!(topic = %state.event_topic, offset, "event published");
    Ok((
        StatusCode::ACCEPTED,
        Json(PublishEventResponse {
            topic: state.event_topic.clone(),
            offset,
        }),
    ))
}

/// Event routes mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/internal/events", post(publish_event))
}
