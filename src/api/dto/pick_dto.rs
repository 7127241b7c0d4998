//! Pick submission DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{DraftPick, NominationId, ParticipantId};
use crate::service::{PickOutcome, PickRequest};

/// Request body for `POST /drafts/{id}/picks`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SubmitPickRequest {
    /// Participant submitting the pick.
    pub participant_id: ParticipantId,
    /// Nomination chosen.
    pub nomination_id: NominationId,
    /// Client token; resubmitting with the same token returns the stored
    /// pick instead of failing.
    #[serde(default)]
    pub idempotency_token: Option<String>,
    /// Pick number the client believes is on the clock. A stale value is
    /// rejected as a retryable conflict.
    #[serde(default)]
    pub expected_pick_number: Option<i32>,
}

impl From<SubmitPickRequest> for PickRequest {
    fn from(req: SubmitPickRequest) -> Self {
        Self {
            participant_id: req.participant_id,
            nomination_id: req.nomination_id,
            idempotency_token: req.idempotency_token,
            expected_pick_number: req.expected_pick_number,
        }
    }
}

/// Response body for pick submissions.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PickResponse {
    /// The stored pick.
    pub pick: DraftPick,
    /// `true` when this is a replay of an earlier submission.
    pub replayed: bool,
}

impl From<PickOutcome> for PickResponse {
    fn from(outcome: PickOutcome) -> Self {
        Self {
            pick: outcome.pick,
            replayed: outcome.replayed,
        }
    }
}
