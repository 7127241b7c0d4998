//! REST API layer: route handlers, DTOs, and router composition.
//!
//! All resource endpoints are mounted under `/api/v1`; `/health` sits at
//! the root. With the `swagger-ui` feature the OpenAPI document is served
//! at `/api-docs/openapi.json` and browsable at `/swagger-ui`.

pub mod dto;
pub mod handlers;

use axum::Router;
use utoipa::OpenApi;

use crate::app_state::AppState;

/// OpenAPI description of the REST surface.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "draft-gateway",
        description = "Live snake-draft turn engine with REST and WebSocket gateway"
    ),
    paths(
        handlers::draft::create_draft,
        handlers::draft::get_draft,
        handlers::draft::start_draft,
        handlers::draft::pause_draft,
        handlers::draft::resume_draft,
        handlers::draft::cancel_draft,
        handlers::draft::force_tick,
        handlers::draft::override_lock,
        handlers::draft::list_events,
        handlers::draft::upsert_results,
        handlers::draft::standings,
        handlers::draft::cancel_season,
        handlers::pick::submit_pick,
        handlers::pick::get_pick,
        handlers::pick::amend_pick,
        handlers::autodraft::get_autodraft,
        handlers::autodraft::set_autodraft,
        handlers::system::health_handler,
    ),
    tags(
        (name = "Drafts", description = "Draft lifecycle and event log"),
        (name = "Picks", description = "Pick submission"),
        (name = "Autodraft", description = "Per-participant autodraft settings"),
        (name = "System", description = "Operational endpoints"),
    )
)]
pub struct ApiDoc;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
}
