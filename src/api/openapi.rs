//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::handlers;

/// Generated OpenAPI description of every REST endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "catalog-cache",
        description = "Read-through catalog cache over the submission service"
    ),
    paths(
        handlers::catalog::list_entries,
        handlers::catalog::get_entry,
        handlers::events::publish_event,
        handlers::system::health_handler,
        handlers::system::status_handler,
        handlers::system::metrics_handler,
    ),
    tags(
        (name = "Catalog", description = "Catalog lookups"),
        (name = "Events", description = "Item event ingestion"),
        (name = "System", description = "Health, resilience status and metrics"),
    )
)]
pub struct ApiDoc;
