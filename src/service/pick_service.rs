//! Pick submission: validates a pick under the draft lock and advances the
//! draft, completing it on the final pick.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;

use super::commit_and_publish;
use crate::domain::{
    Clock, DraftEventType, DraftId, DraftPick, DraftStatus, EventSink, NominationId,
    ParticipantId,
};
use crate::error::DraftError;
use crate::persistence::{DraftStore, DraftTx, append_event};

/// A participant's pick submission.
#[derive(Debug, Clone)]
pub struct PickRequest {
    /// Participant submitting.
    pub participant_id: ParticipantId,
    /// Nomination chosen.
    pub nomination_id: NominationId,
    /// Client token making resubmission safe.
    pub idempotency_token: Option<String>,
    /// Pick number the client believes is on the clock.
    pub expected_pick_number: Option<i32>,
}

/// Result of a submission.
#[derive(Debug, Clone)]
pub struct PickOutcome {
    /// The stored pick.
    pub pick: DraftPick,
    /// `true` if the pick was returned from an earlier submission with the
    /// same idempotency token.
    pub replayed: bool,
}

/// Who made a pick, recorded in the `draft.pick.made` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickSource {
    /// Submitted by the participant.
    Participant,
    /// Chosen by the autodraft resolver on deadline.
    Autodraft,
}

/// Handles pick submissions.
#[derive(Debug, Clone)]
pub struct PickService {
    store: Arc<dyn DraftStore>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl PickService {
    /// Creates a pick service.
    #[must_use]
    pub fn new(store: Arc<dyn DraftStore>, sink: Arc<dyn EventSink>, clock: Arc<dyn Clock>) -> Self {
        Self { store, sink, clock }
    }

    /// Submits a pick for the seat on the clock.
    ///
    /// A resubmission carrying the token of a stored pick returns that pick
    /// unchanged, whatever the draft's state is now.
    ///
    /// # Errors
    ///
    /// - [`DraftError::DraftNotActive`] unless the draft is `IN_PROGRESS`.
    /// - [`DraftError::PickConflict`] if `expected_pick_number` is stale or a
    ///   concurrent submission won.
    /// - [`DraftError::NotYourTurn`] if the participant does not hold the
    ///   seat on the clock.
    /// - Nomination and lock errors from [`apply_pick`].
    pub async fn submit_pick(
        &self,
        draft_id: DraftId,
        request: PickRequest,
    ) -> Result<PickOutcome, DraftError> {
        let mut tx = self.store.begin(draft_id).await?;

        if let Some(token) = request.idempotency_token.as_deref()
            && let Some(pick) = tx.pick_by_token(token).await?
        {
            tracing::debug!(%draft_id, pick_number = pick.pick_number, "idempotent pick replay");
            return Ok(PickOutcome {
                pick,
                replayed: true,
            });
        }

        let draft = tx.draft();
        if draft.status != DraftStatus::InProgress {
            return Err(draft.not_active(DraftStatus::InProgress));
        }
        if let Some(expected) = request.expected_pick_number
            && draft.current_pick_number != Some(expected)
        {
            return Err(DraftError::PickConflict {
                draft_id,
                pick_number: expected,
            });
        }

        let now = self.clock.now();
        let pick = apply_pick(
            tx.as_mut(),
            request.participant_id,
            request.nomination_id,
            request.idempotency_token,
            PickSource::Participant,
            now,
        )
        .await?;
        commit_and_publish(tx, self.sink.as_ref()).await?;

        tracing::info!(
            %draft_id,
            pick_number = pick.pick_number,
            participant_id = %pick.participant_id,
            nomination_id = %pick.nomination_id,
            "pick made"
        );
        Ok(PickOutcome {
            pick,
            replayed: false,
        })
    }

    /// Reads a stored pick.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::PickNotFound`] if the slot is empty.
    pub async fn get_pick(&self, draft_id: DraftId, pick_number: i32) -> Result<DraftPick, DraftError> {
        let view = self.store.load_view(draft_id).await?;
        view.picks
            .into_iter()
            .find(|pick| pick.pick_number == pick_number)
            .ok_or(DraftError::PickNotFound {
                draft_id,
                pick_number,
            })
    }

    /// Rejects any attempt to change or remove a pick.
    ///
    /// # Errors
    ///
    /// Always fails: [`DraftError::PickImmutable`] if the slot is filled,
    /// [`DraftError::PickNotFound`] otherwise.
    pub async fn amend_pick(&self, draft_id: DraftId, pick_number: i32) -> Result<(), DraftError> {
        self.get_pick(draft_id, pick_number).await?;
        Err(DraftError::PickImmutable {
            draft_id,
            pick_number,
        })
    }
}

/// Validates and records the pick on the clock inside an open transaction.
///
/// Advances the current pick and deadline, appends `draft.pick.made`, and on
/// the final pick completes the draft and appends `draft.completed`. Shared
/// by participant submissions and autodraft so both store picks the same way.
///
/// # Errors
///
/// - [`DraftError::DraftNotActive`] unless the draft is `IN_PROGRESS`.
/// - [`DraftError::NotYourTurn`] if the participant does not hold the seat
///   on the clock.
/// - [`DraftError::NominationNotFound`], [`DraftError::NominationNotInCeremony`],
///   [`DraftError::NominationTaken`] for bad nominations.
/// - [`DraftError::DraftLocked`] past the ceremony lock without override.
/// - [`DraftError::PickConflict`] if the store rejects the pick number.
pub(crate) async fn apply_pick(
    tx: &mut dyn DraftTx,
    participant_id: ParticipantId,
    nomination_id: NominationId,
    idempotency_token: Option<String>,
    source: PickSource,
    now: DateTime<Utc>,
) -> Result<DraftPick, DraftError> {
    let draft = tx.draft().clone();
    let turn = draft.current_turn()?;

    let seats = tx.seats().await?;
    let seat = seats
        .iter()
        .find(|seat| seat.seat_number == turn.seat_number)
        .ok_or_else(|| {
            DraftError::Internal(format!(
                "draft {} has no seat {}",
                draft.id, turn.seat_number
            ))
        })?;
    if seat.participant_id != participant_id {
        return Err(DraftError::NotYourTurn {
            pick_number: turn.pick_number,
            expected_seat: turn.seat_number,
            participant_id,
        });
    }

    let nomination = tx
        .nomination(nomination_id)
        .await?
        .ok_or(DraftError::NominationNotFound(nomination_id))?;
    if nomination.ceremony_id != draft.ceremony_id {
        return Err(DraftError::NominationNotInCeremony(nomination_id));
    }
    if tx.is_drafted(nomination_id).await? {
        return Err(DraftError::NominationTaken(nomination_id));
    }
    let ceremony = tx.ceremony().await?;
    if ceremony.is_locked(now) && !draft.allow_drafting_after_lock {
        return Err(DraftError::DraftLocked(draft.id));
    }

    let pick = DraftPick {
        draft_id: draft.id,
        pick_number: turn.pick_number,
        round_number: turn.round_number,
        seat_number: turn.seat_number,
        participant_id,
        nomination_id,
        made_at: now,
        idempotency_token,
    };
    tx.insert_pick(&pick).await?;

    let next_pick = pick.pick_number.checked_add(1).ok_or_else(|| {
        DraftError::Internal(format!("pick number overflow on draft {}", draft.id))
    })?;
    let completes = draft
        .total_required_picks
        .is_some_and(|total| next_pick > total);

    {
        let row = tx.draft_mut();
        row.current_pick_number = Some(next_pick);
        row.timer_remaining_ms = None;
        row.pick_deadline_at = if completes {
            None
        } else {
            row.fresh_deadline(now)
        };
    }
    let deadline = tx.draft().pick_deadline_at;

    append_event(
        tx,
        DraftEventType::PickMade,
        json!({
            "pick_number": pick.pick_number,
            "round_number": pick.round_number,
            "seat_number": pick.seat_number,
            "participant_id": pick.participant_id,
            "nomination_id": pick.nomination_id,
            "made_at": pick.made_at,
            "autopick": source == PickSource::Autodraft,
            "next_pick_number": if completes { None } else { Some(next_pick) },
            "pick_deadline_at": deadline,
        }),
        now,
    )
    .await?;

    if completes {
        tx.draft_mut().apply_transition(DraftStatus::Completed, now)?;
        append_event(
            tx,
            DraftEventType::DraftCompleted,
            json!({ "total_picks": pick.pick_number, "completed_at": now }),
            now,
        )
        .await?;
        tracing::info!(draft_id = %draft.id, total_picks = pick.pick_number, "draft completed");
    }

    Ok(pick)
}
