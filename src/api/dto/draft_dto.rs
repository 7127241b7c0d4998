//! Draft-related DTOs for creation, results and standings.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{CeremonyId, DraftId, DraftOrderType, RemainderStrategy, SeasonId};
use crate::persistence::NewDraft;
use crate::service::{ResultEntry, Standing};

/// Request body for `POST /drafts`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateDraftRequest {
    /// Owning season; one draft per season.
    pub season_id: SeasonId,
    /// Ceremony whose nominations are drafted.
    pub ceremony_id: CeremonyId,
    /// Turn order. Defaults to `SNAKE`.
    #[serde(default = "default_order_type")]
    pub order_type: DraftOrderType,
    /// Picks each seat makes.
    pub picks_per_seat: i32,
    /// Optional explicit total picks.
    #[serde(default)]
    pub total_picks_override: Option<i32>,
    /// Leftover nominations treatment. Defaults to `UNDRAFTED`.
    #[serde(default = "default_remainder")]
    pub remainder_strategy: RemainderStrategy,
    /// Seconds per pick; omit for an untimed draft.
    #[serde(default)]
    pub pick_timer_seconds: Option<i32>,
    /// Seed for reproducible autopicks.
    #[serde(default)]
    pub auto_pick_seed: Option<i64>,
}

fn default_order_type() -> DraftOrderType {
    DraftOrderType::Snake
}

fn default_remainder() -> RemainderStrategy {
    RemainderStrategy::Undrafted
}

impl From<CreateDraftRequest> for NewDraft {
    fn from(req: CreateDraftRequest) -> Self {
        Self {
            season_id: req.season_id,
            ceremony_id: req.ceremony_id,
            order_type: req.order_type,
            picks_per_seat: req.picks_per_seat,
            total_picks_override: req.total_picks_override,
            remainder_strategy: req.remainder_strategy,
            pick_timer_seconds: req.pick_timer_seconds,
            auto_pick_seed: req.auto_pick_seed,
        }
    }
}

/// Request body for `PUT /drafts/{id}/results`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpsertResultsRequest {
    /// Nomination outcomes to create or replace.
    pub results: Vec<ResultEntry>,
}

/// Response body for `GET /drafts/{id}/standings`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StandingsResponse {
    /// Draft the standings are for.
    pub draft_id: DraftId,
    /// Participants ordered by points, best first.
    pub standings: Vec<Standing>,
}
