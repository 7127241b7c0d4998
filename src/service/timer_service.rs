//! Deadline enforcement for the seat on the clock.
//!
//! [`TimerService::tick`] is what the sweeper calls for each overdue draft,
//! and what operators call to force an autopick. It re-reads the draft
//! under its lock, so a pick that landed between the sweeper's query and the
//! tick is never overridden.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use super::autodraft;
use super::commit_and_publish;
use super::pick_service::{PickSource, apply_pick};
use crate::domain::{
    Clock, DraftEventType, DraftId, DraftPick, DraftStatus, EventSink, NominationId,
    ParticipantId,
};
use crate::error::DraftError;
use crate::persistence::{DraftStore, append_event};

/// How strictly a tick checks the deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickMode {
    /// Sweeper tick: acts only if the deadline has elapsed.
    Sweep,
    /// Operator tick: acts regardless of the deadline.
    Force,
}

/// What a tick did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    /// Nothing to do: the draft is not running or its deadline is ahead.
    Idle {
        /// Draft status at tick time.
        status: DraftStatus,
    },
    /// Autodraft picked for the seat on the clock.
    Autopicked {
        /// The stored pick.
        pick: DraftPick,
    },
    /// The seat had no autodraft; the expiry was announced and the deadline
    /// re-armed.
    Expired {
        /// Pick that timed out.
        pick_number: i32,
        /// Participant whose turn it was.
        participant_id: ParticipantId,
    },
}

/// Runs deadline ticks.
#[derive(Debug, Clone)]
pub struct TimerService {
    store: Arc<dyn DraftStore>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl TimerService {
    /// Creates a timer service.
    #[must_use]
    pub fn new(store: Arc<dyn DraftStore>, sink: Arc<dyn EventSink>, clock: Arc<dyn Clock>) -> Self {
        Self { store, sink, clock }
    }

    /// Processes the seat on the clock of one draft.
    ///
    /// With autodraft enabled for that seat the resolver picks through the
    /// regular pick path. Otherwise `draft.pick.expired` is appended and the
    /// deadline re-armed for another timer period; the seat keeps the turn
    /// and is autopicked on a later tick if it enables autodraft meanwhile.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::DraftNotFound`], persistence errors, or any
    /// validation error raised while applying the autopick.
    pub async fn tick(&self, draft_id: DraftId, mode: TickMode) -> Result<TickOutcome, DraftError> {
        let mut tx = self.store.begin(draft_id).await?;
        let now = self.clock.now();
        let draft = tx.draft().clone();

        if draft.status != DraftStatus::InProgress
            || draft.all_picks_made()
            || (mode == TickMode::Sweep && !draft.deadline_elapsed(now))
        {
            tracing::debug!(%draft_id, status = %draft.status, "tick found nothing to do");
            return Ok(TickOutcome::Idle {
                status: draft.status,
            });
        }

        let turn = draft.current_turn()?;
        let seats = tx.seats().await?;
        let participant_id = seats
            .iter()
            .find(|seat| seat.seat_number == turn.seat_number)
            .map(|seat| seat.participant_id)
            .ok_or_else(|| {
                DraftError::Internal(format!("draft {draft_id} has no seat {}", turn.seat_number))
            })?;

        let config = tx
            .autodraft_config(participant_id)
            .await?
            .filter(|config| config.enabled);
        let choice: Option<NominationId> = match &config {
            Some(config) => autodraft::resolve(tx.as_mut(), config, turn.pick_number).await?,
            None => None,
        };

        let outcome = if let Some(nomination_id) = choice {
            let pick = apply_pick(
                tx.as_mut(),
                participant_id,
                nomination_id,
                None,
                PickSource::Autodraft,
                now,
            )
            .await?;
            tracing::info!(
                %draft_id,
                pick_number = pick.pick_number,
                %participant_id,
                %nomination_id,
                "autopick made"
            );
            TickOutcome::Autopicked { pick }
        } else {
            let next_deadline = {
                let row = tx.draft_mut();
                row.pick_deadline_at = row.fresh_deadline(now);
                row.pick_deadline_at
            };
            append_event(
                tx.as_mut(),
                DraftEventType::PickExpired,
                json!({
                    "pick_number": turn.pick_number,
                    "seat_number": turn.seat_number,
                    "participant_id": participant_id,
                    "autodraft": config.is_some(),
                    "pick_deadline_at": next_deadline,
                }),
                now,
            )
            .await?;
            tracing::info!(%draft_id, pick_number = turn.pick_number, %participant_id, "pick expired");
            TickOutcome::Expired {
                pick_number: turn.pick_number,
                participant_id,
            }
        };

        commit_and_publish(tx, self.sink.as_ref()).await?;
        Ok(outcome)
    }

    /// Pushes an overdue deadline back by one timer period.
    ///
    /// Called after a tick failed so the draft leaves the overdue set and
    /// cannot hold the head of every sweep batch. Drafts that are no longer
    /// running or no longer overdue are left as they are. Returns the
    /// resulting deadline.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::DraftNotFound`] or a persistence error.
    pub async fn defer(&self, draft_id: DraftId) -> Result<Option<DateTime<Utc>>, DraftError> {
        let mut tx = self.store.begin(draft_id).await?;
        let now = self.clock.now();
        let draft = tx.draft_mut();
        if draft.status != DraftStatus::InProgress || !draft.deadline_elapsed(now) {
            return Ok(draft.pick_deadline_at);
        }
        draft.pick_deadline_at = draft.fresh_deadline(now);
        let deadline = draft.pick_deadline_at;
        commit_and_publish(tx, self.sink.as_ref()).await?;
        tracing::debug!(%draft_id, ?deadline, "deadline deferred after failed tick");
        Ok(deadline)
    }
}
