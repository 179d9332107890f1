//! REST API layer: route handlers, DTOs, OpenAPI document, request
//! metrics and router composition.
//!
//! Resource endpoints are mounted under `/api/v1`; `/health`, `/status`
//! and `/metrics` sit at the root.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod openapi;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints bound to `state`.
///
/// Every routed request is counted in the request metrics.
pub fn build_router(state: AppState) -> Router {
    #[allow(unused_mut)]
    let mut router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::track_requests,
        ));

    #[cfg(feature = "swagger-ui")]
    {
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;
        router = router.merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        );
    }

    router.with_state(state)
}
