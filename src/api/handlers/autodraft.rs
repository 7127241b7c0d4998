//! Autodraft settings handlers.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::domain::{AutodraftConfig, DraftId, ParticipantId};
use crate::error::{DraftError, ErrorResponse};
use crate::service::AutodraftSettings;

/// `GET /drafts/{id}/autodraft/{participant_id}` — Read autodraft settings.
///
/// # Errors
///
/// Returns [`DraftError::AutodraftConfigNotFound`] if none were saved.
#[utoipa::path(
    get,
    path = "/api/v1/drafts/{id}/autodraft/{participant_id}",
    tag = "Autodraft",
    summary = "Get autodraft settings",
    params(
        ("id" = uuid::Uuid, Path, description = "Draft ID"),
        ("participant_id" = uuid::Uuid, Path, description = "Participant ID"),
    ),
    responses(
        (status = 200, description = "Autodraft settings", body = AutodraftConfig),
        (status = 404, description = "No settings saved", body = ErrorResponse),
    )
)]
pub async fn get_autodraft(
    State(state): State<AppState>,
    Path((id, participant_id)): Path<(DraftId, ParticipantId)>,
) -> Result<Json<AutodraftConfig>, DraftError> {
    Ok(Json(
        state
            .draft_service
            .get_autodraft(id, participant_id)
            .await?,
    ))
}

/// `PUT /drafts/{id}/autodraft/{participant_id}` — Save autodraft settings.
///
/// # Errors
///
/// Returns [`DraftError`] if the participant has no seat, the plan is
/// invalid, or the draft is terminal.
#[utoipa::path(
    put,
    path = "/api/v1/drafts/{id}/autodraft/{participant_id}",
    tag = "Autodraft",
    summary = "Set autodraft settings",
    description = "Enables or disables autodraft for a participant. PLAN requires a plan owned by the participant.",
    params(
        ("id" = uuid::Uuid, Path, description = "Draft ID"),
        ("participant_id" = uuid::Uuid, Path, description = "Participant ID"),
    ),
    request_body = AutodraftSettings,
    responses(
        (status = 200, description = "Saved settings", body = AutodraftConfig),
        (status = 400, description = "Invalid plan", body = ErrorResponse),
        (status = 404, description = "Participant has no seat", body = ErrorResponse),
    )
)]
pub async fn set_autodraft(
    State(state): State<AppState>,
    Path((id, participant_id)): Path<(DraftId, ParticipantId)>,
    Json(settings): Json<AutodraftSettings>,
) -> Result<Json<AutodraftConfig>, DraftError> {
    Ok(Json(
        state
            .draft_service
            .set_autodraft(id, participant_id, settings)
            .await?,
    ))
}

/// Autodraft routes (mounted under `/api/v1`).
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/drafts/{id}/autodraft/{participant_id}",
        get(get_autodraft).put(set_autodraft),
    )
}
