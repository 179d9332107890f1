//! Catalog read handlers: list and get-by-id.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::CatalogEntryDto;
use crate::app_state::AppState;
use crate::domain::Provenance;
use crate::error::{CatalogError, ErrorResponse};

/// `GET /catalog` — List locally stored entries.
///
/// # Errors
///
/// Returns [`CatalogError::PersistenceError`] if the store cannot be read.
#[utoipa::path(
    get,
    path = "/api/v1/catalog",
    tag = "Catalog",
    summary = "List catalog entries",
    description = "Returns every entry in the local store, most recently synced first. Upstream-only entries are not listed.",
    responses(
        (status = 200, description = "Stored entries", body = Vec<CatalogEntryDto>),
        (status = 500, description = "Store failure", body = ErrorResponse),
    )
)]
pub async fn list_entries(State(state): State<AppState>) -> Result<impl IntoResponse, CatalogError> {
    let entries = state.read_path.list().await?;
    let data: Vec<CatalogEntryDto> = entries
        .into_iter()
        .map(|entry| CatalogEntryDto::new(entry, Provenance::Local))
        .collect();
    Ok(Json(data))
}

/// `GET /catalog/{id}` — Resolve one entry, local store first.
///
/// # Errors
///
/// Returns [`CatalogError::InvalidRequest`] for a malformed id and
/// [`CatalogError::EntryNotFound`] when neither the store nor the upstream
/// has the entry.
#[utoipa::path(
    get,
    path = "/api/v1/catalog/{id}",
    tag = "Catalog",
    summary = "Get catalog entry",
    description = "Looks the entry up in the local store and falls back to the submission service. The `source` field tells which one answered.",
    params(
        ("id" = String, Path, description = "Entry UUID"),
    ),
    responses(
        (status = 200, description = "Entry found", body = CatalogEntryDto),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Entry not found", body = ErrorResponse),
    )
)]
pub async fn get_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, CatalogError> {
    let resolved = state.read_path.get(&id).await?;
    Ok(Json(CatalogEntryDto::from(resolved)))
}

/// Catalog routes mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/catalog", get(list_entries))
        .route("/catalog/{id}", get(get_entry))
}
