//! Pick handlers: submit, read, and the rejecting amend paths.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{PickResponse, SubmitPickRequest};
use crate::app_state::AppState;
use crate::domain::{DraftId, DraftPick};
use crate::error::{DraftError, ErrorResponse};

/// `POST /drafts/{id}/picks` — Submit a pick for the seat on the clock.
///
/// Returns 201 for a new pick and 200 when an idempotency token matched a
/// stored pick.
///
/// # Errors
///
/// Returns [`DraftError`] when the draft is not running, it is not the
/// participant's turn, the nomination is unavailable, or a concurrent pick won.
#[utoipa::path(
    post,
    path = "/api/v1/drafts/{id}/picks",
    tag = "Picks",
    summary = "Submit a pick",
    description = "Records a pick for the seat on the clock. Resubmitting with the same idempotency token returns the stored pick unchanged.",
    params(("id" = uuid::Uuid, Path, description = "Draft ID")),
    request_body = SubmitPickRequest,
    responses(
        (status = 201, description = "Pick recorded", body = PickResponse),
        (status = 200, description = "Idempotent replay of a stored pick", body = PickResponse),
        (status = 404, description = "Draft or nomination not found", body = ErrorResponse),
        (status = 409, description = "Not your turn, nomination taken, draft not running, or concurrent conflict", body = ErrorResponse),
    )
)]
pub async fn submit_pick(
    State(state): State<AppState>,
    Path(id): Path<DraftId>,
    Json(req): Json<SubmitPickRequest>,
) -> Result<impl IntoResponse, DraftError> {
    let outcome = state.pick_service.submit_pick(id, req.into()).await?;
    let status = if outcome.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(PickResponse::from(outcome))))
}

/// `GET /drafts/{id}/picks/{pick_number}` — Read one pick.
///
/// # Errors
///
/// Returns [`DraftError::PickNotFound`] if the slot is empty.
#[utoipa::path(
    get,
    path = "/api/v1/drafts/{id}/picks/{pick_number}",
    tag = "Picks",
    summary = "Get a pick",
    params(
        ("id" = uuid::Uuid, Path, description = "Draft ID"),
        ("pick_number" = i32, Path, description = "Pick number"),
    ),
    responses(
        (status = 200, description = "Pick", body = DraftPick),
        (status = 404, description = "Pick not found", body = ErrorResponse),
    )
)]
pub async fn get_pick(
    State(state): State<AppState>,
    Path((id, pick_number)): Path<(DraftId, i32)>,
) -> Result<Json<DraftPick>, DraftError> {
    Ok(Json(state.pick_service.get_pick(id, pick_number).await?))
}

/// `PUT|DELETE /drafts/{id}/picks/{pick_number}` — Always rejected.
///
/// # Errors
///
/// Always: [`DraftError::PickImmutable`] for a filled slot,
/// [`DraftError::PickNotFound`] otherwise.
#[utoipa::path(
    put,
    path = "/api/v1/drafts/{id}/picks/{pick_number}",
    tag = "Picks",
    summary = "Amend a pick (rejected)",
    description = "Picks are append-only. Filled slots answer 409, empty slots 404.",
    params(
        ("id" = uuid::Uuid, Path, description = "Draft ID"),
        ("pick_number" = i32, Path, description = "Pick number"),
    ),
    responses(
        (status = 404, description = "Pick not found", body = ErrorResponse),
        (status = 409, description = "Pick is immutable", body = ErrorResponse),
    )
)]
pub async fn amend_pick(
    State(state): State<AppState>,
    Path((id, pick_number)): Path<(DraftId, i32)>,
) -> Result<StatusCode, DraftError> {
    state.pick_service.amend_pick(id, pick_number).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Pick routes (mounted under `/api/v1`).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/drafts/{id}/picks", post(submit_pick))
        .route(
            "/drafts/{id}/picks/{pick_number}",
            get(get_pick).put(amend_pick).delete(amend_pick),
        )
}
