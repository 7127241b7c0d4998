//! Draft lifecycle handlers: create, snapshot, start/pause/resume/cancel,
//! tick, lock override, event log, results and standings.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::api::dto::{
    CreateDraftRequest, EventsQuery, EventsResponse, StandingsResponse, UpsertResultsRequest,
};
use crate::app_state::AppState;
use crate::domain::{Draft, DraftId, DraftResult, SeasonId};
use crate::error::{DraftError, ErrorResponse};
use crate::service::{DraftSnapshot, TickMode, TickOutcome};

/// `POST /drafts` — Create a draft for a season.
///
/// # Errors
///
/// Returns [`DraftError`] on invalid parameters or a duplicate season.
#[utoipa::path(
    post,
    path = "/api/v1/drafts",
    tag = "Drafts",
    summary = "Create a draft",
    description = "Creates a PENDING draft for a season. Seats are assigned when the draft starts.",
    request_body = CreateDraftRequest,
    responses(
        (status = 201, description = "Draft created", body = Draft),
        (status = 400, description = "Invalid parameters or season already has a draft", body = ErrorResponse),
    )
)]
pub async fn create_draft(
    State(state): State<AppState>,
    Json(req): Json<CreateDraftRequest>,
) -> Result<impl IntoResponse, DraftError> {
    let draft = state.draft_service.create_draft(req.into()).await?;
    Ok((StatusCode::CREATED, Json(draft)))
}

/// `GET /drafts/{id}` — Draft snapshot with seats, picks and turn.
///
/// # Errors
///
/// Returns [`DraftError::DraftNotFound`] if the draft does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/drafts/{id}",
    tag = "Drafts",
    summary = "Get draft snapshot",
    description = "Returns the draft row, its seats and picks, and the turn on the clock while IN_PROGRESS.",
    params(("id" = uuid::Uuid, Path, description = "Draft ID")),
    responses(
        (status = 200, description = "Draft snapshot", body = DraftSnapshot),
        (status = 404, description = "Draft not found", body = ErrorResponse),
    )
)]
pub async fn get_draft(
    State(state): State<AppState>,
    Path(id): Path<DraftId>,
) -> Result<Json<DraftSnapshot>, DraftError> {
    Ok(Json(state.draft_service.snapshot(id).await?))
}

/// `POST /drafts/{id}/start` — Start a pending draft.
///
/// # Errors
///
/// Returns [`DraftError`] if the draft is not PENDING or the roster is empty.
#[utoipa::path(
    post,
    path = "/api/v1/drafts/{id}/start",
    tag = "Drafts",
    summary = "Start a draft",
    description = "Assigns seats from the season roster, fixes the total picks, and puts pick 1 on the clock.",
    params(("id" = uuid::Uuid, Path, description = "Draft ID")),
    responses(
        (status = 200, description = "Draft started", body = Draft),
        (status = 404, description = "Draft not found", body = ErrorResponse),
        (status = 409, description = "Draft not PENDING or empty roster", body = ErrorResponse),
    )
)]
pub async fn start_draft(
    State(state): State<AppState>,
    Path(id): Path<DraftId>,
) -> Result<Json<Draft>, DraftError> {
    Ok(Json(state.draft_service.start_draft(id).await?))
}

/// `POST /drafts/{id}/pause` — Pause a running draft.
///
/// # Errors
///
/// Returns [`DraftError`] if the draft is not IN_PROGRESS.
#[utoipa::path(
    post,
    path = "/api/v1/drafts/{id}/pause",
    tag = "Drafts",
    summary = "Pause a draft",
    description = "Freezes the remaining pick time and rejects picks until resumed.",
    params(("id" = uuid::Uuid, Path, description = "Draft ID")),
    responses(
        (status = 200, description = "Draft paused", body = Draft),
        (status = 409, description = "Illegal transition", body = ErrorResponse),
    )
)]
pub async fn pause_draft(
    State(state): State<AppState>,
    Path(id): Path<DraftId>,
) -> Result<Json<Draft>, DraftError> {
    Ok(Json(state.draft_service.pause_draft(id).await?))
}

/// `POST /drafts/{id}/resume` — Resume a paused draft.
///
/// # Errors
///
/// Returns [`DraftError`] if the draft is not PAUSED.
#[utoipa::path(
    post,
    path = "/api/v1/drafts/{id}/resume",
    tag = "Drafts",
    summary = "Resume a draft",
    description = "Restores the frozen pick time and reopens picks.",
    params(("id" = uuid::Uuid, Path, description = "Draft ID")),
    responses(
        (status = 200, description = "Draft resumed", body = Draft),
        (status = 409, description = "Illegal transition", body = ErrorResponse),
    )
)]
pub async fn resume_draft(
    State(state): State<AppState>,
    Path(id): Path<DraftId>,
) -> Result<Json<Draft>, DraftError> {
    Ok(Json(state.draft_service.resume_draft(id).await?))
}

/// `POST /drafts/{id}/cancel` — Cancel a draft.
///
/// # Errors
///
/// Returns [`DraftError`] if the draft is already terminal.
#[utoipa::path(
    post,
    path = "/api/v1/drafts/{id}/cancel",
    tag = "Drafts",
    summary = "Cancel a draft",
    params(("id" = uuid::Uuid, Path, description = "Draft ID")),
    responses(
        (status = 200, description = "Draft cancelled", body = Draft),
        (status = 409, description = "Illegal transition", body = ErrorResponse),
    )
)]
pub async fn cancel_draft(
    State(state): State<AppState>,
    Path(id): Path<DraftId>,
) -> Result<Json<Draft>, DraftError> {
    Ok(Json(state.draft_service.cancel_draft(id).await?))
}

/// `POST /drafts/{id}/tick` — Operator force tick.
///
/// # Errors
///
/// Returns [`DraftError`] if the draft does not exist or the autopick fails.
#[utoipa::path(
    post,
    path = "/api/v1/drafts/{id}/tick",
    tag = "Drafts",
    summary = "Force a deadline tick",
    description = "Processes the seat on the clock as if its deadline had elapsed: autopicks when enabled, otherwise announces the expiry.",
    params(("id" = uuid::Uuid, Path, description = "Draft ID")),
    responses(
        (status = 200, description = "Tick outcome", body = TickOutcome),
        (status = 404, description = "Draft not found", body = ErrorResponse),
    )
)]
pub async fn force_tick(
    State(state): State<AppState>,
    Path(id): Path<DraftId>,
) -> Result<Json<TickOutcome>, DraftError> {
    Ok(Json(state.timer_service.tick(id, TickMode::Force).await?))
}

/// `POST /drafts/{id}/override-lock` — Allow picks past the ceremony lock.
///
/// # Errors
///
/// Returns [`DraftError`] if the draft is terminal.
#[utoipa::path(
    post,
    path = "/api/v1/drafts/{id}/override-lock",
    tag = "Drafts",
    summary = "Override the ceremony draft lock",
    description = "Lets picks continue after the ceremony's draft lock. The override is audited.",
    params(("id" = uuid::Uuid, Path, description = "Draft ID")),
    responses(
        (status = 200, description = "Lock overridden", body = Draft),
        (status = 409, description = "Draft is terminal", body = ErrorResponse),
    )
)]
pub async fn override_lock(
    State(state): State<AppState>,
    Path(id): Path<DraftId>,
) -> Result<Json<Draft>, DraftError> {
    Ok(Json(state.draft_service.override_lock(id).await?))
}

/// `GET /drafts/{id}/events` — Page through the event log.
///
/// # Errors
///
/// Returns [`DraftError::DraftNotFound`] if the draft does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/drafts/{id}/events",
    tag = "Drafts",
    summary = "List events after a version",
    description = "Returns the gap-free suffix of the draft's event log after `after_version`, in version order.",
    params(("id" = uuid::Uuid, Path, description = "Draft ID"), EventsQuery),
    responses(
        (status = 200, description = "Event page", body = EventsResponse),
        (status = 404, description = "Draft not found", body = ErrorResponse),
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    Path(id): Path<DraftId>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<EventsResponse>, DraftError> {
    let events = state
        .draft_service
        .events_since(id, query.after_version, query.limit)
        .await?;
    Ok(Json(EventsResponse::new(id, query.after_version, events)))
}

/// `PUT /drafts/{id}/results` — Record nomination results.
///
/// # Errors
///
/// Returns [`DraftError`] unless the draft is COMPLETED.
#[utoipa::path(
    put,
    path = "/api/v1/drafts/{id}/results",
    tag = "Drafts",
    summary = "Upsert results",
    description = "Creates or replaces nomination outcomes. Accepted only once the draft is COMPLETED.",
    params(("id" = uuid::Uuid, Path, description = "Draft ID")),
    request_body = UpsertResultsRequest,
    responses(
        (status = 200, description = "All results of the draft", body = Vec<DraftResult>),
        (status = 409, description = "Draft not completed", body = ErrorResponse),
    )
)]
pub async fn upsert_results(
    State(state): State<AppState>,
    Path(id): Path<DraftId>,
    Json(req): Json<UpsertResultsRequest>,
) -> Result<Json<Vec<DraftResult>>, DraftError> {
    Ok(Json(
        state.draft_service.upsert_results(id, &req.results).await?,
    ))
}

/// `GET /drafts/{id}/standings` — Points per participant.
///
/// # Errors
///
/// Returns [`DraftError::DraftNotFound`] if the draft does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/drafts/{id}/standings",
    tag = "Drafts",
    summary = "Get standings",
    params(("id" = uuid::Uuid, Path, description = "Draft ID")),
    responses(
        (status = 200, description = "Standings", body = StandingsResponse),
        (status = 404, description = "Draft not found", body = ErrorResponse),
    )
)]
pub async fn standings(
    State(state): State<AppState>,
    Path(id): Path<DraftId>,
) -> Result<Json<StandingsResponse>, DraftError> {
    let standings = state.draft_service.standings(id).await?;
    Ok(Json(StandingsResponse {
        draft_id: id,
        standings,
    }))
}

/// `POST /seasons/{id}/cancel` — Cancel a season's draft.
///
/// # Errors
///
/// Returns [`DraftError::SeasonNotFound`] if the season has no draft.
#[utoipa::path(
    post,
    path = "/api/v1/seasons/{id}/cancel",
    tag = "Drafts",
    summary = "Cancel a season",
    description = "Cancels the season's draft unless it already completed.",
    params(("id" = uuid::Uuid, Path, description = "Season ID")),
    responses(
        (status = 200, description = "Resulting draft", body = Draft),
        (status = 404, description = "Season has no draft", body = ErrorResponse),
    )
)]
pub async fn cancel_season(
    State(state): State<AppState>,
    Path(id): Path<SeasonId>,
) -> Result<Json<Draft>, DraftError> {
    Ok(Json(state.draft_service.cancel_season(id).await?))
}

/// Draft routes (mounted under `/api/v1`).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/drafts", post(create_draft))
        .route("/drafts/{id}", get(get_draft))
        .route("/drafts/{id}/start", post(start_draft))
        .route("/drafts/{id}/pause", post(pause_draft))
        .route("/drafts/{id}/resume", post(resume_draft))
        .route("/drafts/{id}/cancel", post(cancel_draft))
        .route("/drafts/{id}/tick", post(force_tick))
        .route("/drafts/{id}/override-lock", post(override_lock))
        .route("/drafts/{id}/events", get(list_events))
        .route("/drafts/{id}/results", put(upsert_results))
        .route("/drafts/{id}/standings", get(standings))
        .route("/seasons/{id}/cancel", post(cancel_season))
}
