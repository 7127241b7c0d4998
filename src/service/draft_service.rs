//! Draft lifecycle orchestration.
//!
//! Covers everything that is not a pick or a tick: creation at season
//! setup, start/pause/resume/cancel, season cancellation, the ceremony lock
//! override, snapshots, the event log read path, autodraft settings, and
//! post-draft results.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use super::commit_and_publish;
use crate::domain::{
    AutodraftConfig, AutodraftStrategy, Clock, Draft, DraftEvent, DraftEventType, DraftId,
    DraftPick, DraftResult, DraftSeat, DraftStatus, EventSink, NominationId, ParticipantId,
    PlanId, SeasonId,
};
use crate::error::DraftError;
use crate::persistence::{AuditEntry, DraftStore, DraftTx, NewDraft, append_event};

/// The pick on the clock, derived from the draft row and its seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TurnInfo {
    /// Pick number on the clock.
    pub pick_number: i32,
    /// Round of that pick.
    pub round_number: i32,
    /// Seat on the clock.
    pub seat_number: i32,
    /// Participant holding that seat.
    pub participant_id: ParticipantId,
    /// When the seat runs out of time, if timed.
    pub deadline_at: Option<DateTime<Utc>>,
}

/// A draft with its seats, picks and the turn on the clock.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DraftSnapshot {
    /// The draft row.
    pub draft: Draft,
    /// Seats ordered by seat number.
    pub seats: Vec<DraftSeat>,
    /// Picks ordered by pick number.
    pub picks: Vec<DraftPick>,
    /// Turn on the clock, present only while `IN_PROGRESS`.
    pub turn: Option<TurnInfo>,
}

/// Requested autodraft settings for one participant.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct AutodraftSettings {
    /// Whether the engine picks on deadline.
    pub enabled: bool,
    /// Selection strategy.
    pub strategy: AutodraftStrategy,
    /// Ranked plan, required for `PLAN`.
    pub plan_id: Option<PlanId>,
}

/// One nomination outcome reported after the ceremony.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct ResultEntry {
    /// Nomination the result is for.
    pub nomination_id: NominationId,
    /// Whether it won.
    pub won: bool,
    /// Points awarded.
    pub points: i32,
}

/// A participant's standing computed from their picks and the results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Standing {
    /// Participant.
    pub participant_id: ParticipantId,
    /// Seat the participant held.
    pub seat_number: i32,
    /// Number of won nominations among their picks.
    pub wins: i32,
    /// Sum of points of their won nominations.
    pub points: i64,
}

/// Draft lifecycle service.
#[derive(Debug, Clone)]
pub struct DraftService {
    store: Arc<dyn DraftStore>,
    sink: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    events_page_limit: i64,
}

impl DraftService {
    /// Creates a draft service.
    ///
    /// `events_page_limit` caps how many events [`Self::events_since`]
    /// returns per call.
    #[must_use]
    pub fn new(
        store: Arc<dyn DraftStore>,
        sink: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
        events_page_limit: i64,
    ) -> Self {
        Self {
            store,
            sink,
            clock,
            events_page_limit: events_page_limit.max(1),
        }
    }

    /// Creates a `PENDING` draft for a season.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::InvalidRequest`] for non-positive counts or
    /// timers, or if the season already has a draft.
    pub async fn create_draft(&self, new: NewDraft) -> Result<Draft, DraftError> {
        if new.picks_per_seat <= 0 {
            return Err(DraftError::InvalidRequest(
                "picks_per_seat must be positive".to_string(),
            ));
        }
        if new.total_picks_override.is_some_and(|n| n <= 0) {
            return Err(DraftError::InvalidRequest(
                "total_picks_override must be positive".to_string(),
            ));
        }
        if new.pick_timer_seconds.is_some_and(|n| n <= 0) {
            return Err(DraftError::InvalidRequest(
                "pick_timer_seconds must be positive".to_string(),
            ));
        }
        let draft = self.store.create_draft(new, self.clock.now()).await?;
        tracing::info!(draft_id = %draft.id, season_id = %draft.season_id, "draft created");
        Ok(draft)
    }

    /// Starts a `PENDING` draft.
    ///
    /// Seats are assigned from the season roster in its stored order, the
    /// total required picks is fixed, pick 1 goes on the clock, and
    /// `draft.started` is appended. A draft whose pool allows no picks
    /// completes immediately.
    ///
    /// # Errors
    ///
    /// - [`DraftError::DraftNotActive`] unless the draft is `PENDING`.
    /// - [`DraftError::EmptyRoster`] if the season has no participants.
    pub async fn start_draft(&self, draft_id: DraftId) -> Result<Draft, DraftError> {
        let mut tx = self.store.begin(draft_id).await?;
        let now = self.clock.now();
        if tx.draft().status != DraftStatus::Pending {
            return Err(tx.draft().not_active(DraftStatus::Pending));
        }

        let roster = tx.season_roster().await?;
        if roster.is_empty() {
            return Err(DraftError::EmptyRoster(tx.draft().season_id));
        }
        let seats = roster
            .iter()
            .zip(1..)
            .map(|(participant_id, seat_number)| DraftSeat {
                draft_id,
                seat_number,
                participant_id: *participant_id,
                is_active: true,
            })
            .collect::<Vec<_>>();
        let seat_count = i32::try_from(seats.len())
            .map_err(|_| DraftError::InvalidRequest("roster too large".to_string()))?;
        tx.insert_seats(&seats).await?;
        let pool_size = tx.nomination_count().await?;

        let draft = tx.draft_mut();
        let total = draft.required_picks(seat_count, pool_size);
        draft.apply_transition(DraftStatus::InProgress, now)?;
        draft.seat_count = seat_count;
        draft.total_required_picks = Some(total);
        draft.current_pick_number = Some(1);
        draft.timer_remaining_ms = None;
        draft.pick_deadline_at = draft.fresh_deadline(now);
        let deadline = draft.pick_deadline_at;

        append_event(
            tx.as_mut(),
            DraftEventType::DraftStarted,
            json!({
                "seat_count": seat_count,
                "total_required_picks": total,
                "seats": seats
                    .iter()
                    .map(|s| json!({ "seat_number": s.seat_number, "participant_id": s.participant_id }))
                    .collect::<Vec<_>>(),
                "current_pick_number": 1,
                "pick_deadline_at": deadline,
            }),
            now,
        )
        .await?;

        if total == 0 {
            let draft = tx.draft_mut();
            draft.apply_transition(DraftStatus::Completed, now)?;
            draft.pick_deadline_at = None;
            append_event(
                tx.as_mut(),
                DraftEventType::DraftCompleted,
                json!({ "total_picks": 0, "completed_at": now }),
                now,
            )
            .await?;
        }

        let draft = tx.draft().clone();
        commit_and_publish(tx, self.sink.as_ref()).await?;
        tracing::info!(%draft_id, seat_count, total_required_picks = total, "draft started");
        Ok(draft)
    }

    /// Pauses an `IN_PROGRESS` draft, freezing the remaining pick time.
    ///
    /// # Errors
    ///
    /// Returns the state machine's error for any other status.
    pub async fn pause_draft(&self, draft_id: DraftId) -> Result<Draft, DraftError> {
        let mut tx = self.store.begin(draft_id).await?;
        let now = self.clock.now();
        let draft = tx.draft_mut();
        draft.apply_transition(DraftStatus::Paused, now)?;
        let remaining_ms = draft
            .pick_deadline_at
            .map(|deadline| (deadline - now).num_milliseconds().max(0));
        draft.timer_remaining_ms = remaining_ms;
        draft.pick_deadline_at = None;

        append_event(
            tx.as_mut(),
            DraftEventType::DraftPaused,
            json!({ "remaining_ms": remaining_ms }),
            now,
        )
        .await?;
        let draft = tx.draft().clone();
        commit_and_publish(tx, self.sink.as_ref()).await?;
        tracing::info!(%draft_id, ?remaining_ms, "draft paused");
        Ok(draft)
    }

    /// Resumes a `PAUSED` draft with the frozen remaining time.
    ///
    /// # Errors
    ///
    /// - [`DraftError::DraftNotActive`] for a `PENDING` draft (use start).
    /// - The state machine's error for any other status.
    pub async fn resume_draft(&self, draft_id: DraftId) -> Result<Draft, DraftError> {
        let mut tx = self.store.begin(draft_id).await?;
        let now = self.clock.now();
        let draft = tx.draft_mut();
        if draft.status == DraftStatus::Pending {
            return Err(draft.not_active(DraftStatus::Paused));
        }
        draft.apply_transition(DraftStatus::InProgress, now)?;
        draft.pick_deadline_at = match (draft.pick_timer(), draft.timer_remaining_ms.take()) {
            (Some(_), Some(ms)) => Some(now + chrono::Duration::milliseconds(ms)),
            (Some(timer), None) => Some(now + timer),
            (None, _) => None,
        };
        let deadline = draft.pick_deadline_at;

        append_event(
            tx.as_mut(),
            DraftEventType::DraftResumed,
            json!({ "pick_deadline_at": deadline }),
            now,
        )
        .await?;
        let draft = tx.draft().clone();
        commit_and_publish(tx, self.sink.as_ref()).await?;
        tracing::info!(%draft_id, "draft resumed");
        Ok(draft)
    }

    /// Cancels a draft that has not reached a terminal state.
    ///
    /// # Errors
    ///
    /// Returns the state machine's error for terminal drafts.
    pub async fn cancel_draft(&self, draft_id: DraftId) -> Result<Draft, DraftError> {
        let mut tx = self.store.begin(draft_id).await?;
        let now = self.clock.now();
        cancel_in_tx(tx.as_mut(), now)?;
        append_event(tx.as_mut(), DraftEventType::DraftCancelled, json!({}), now).await?;
        let draft = tx.draft().clone();
        commit_and_publish(tx, self.sink.as_ref()).await?;
        tracing::info!(%draft_id, "draft cancelled");
        Ok(draft)
    }

    /// Cancels the draft of a cancelled season.
    ///
    /// A completed or already cancelled draft is left untouched and
    /// returned as is.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::SeasonNotFound`] if the season has no draft.
    pub async fn cancel_season(&self, season_id: SeasonId) -> Result<Draft, DraftError> {
        let draft_id = self
            .store
            .draft_for_season(season_id)
            .await?
            .ok_or(DraftError::SeasonNotFound(season_id))?;
        let mut tx = self.store.begin(draft_id).await?;
        if tx.draft().status.is_terminal() {
            tracing::info!(
                %season_id,
                %draft_id,
                status = %tx.draft().status,
                "season cancelled; draft already terminal"
            );
            return Ok(tx.draft().clone());
        }

        let now = self.clock.now();
        cancel_in_tx(tx.as_mut(), now)?;
        append_event(
            tx.as_mut(),
            DraftEventType::SeasonCancelled,
            json!({ "season_id": season_id }),
            now,
        )
        .await?;
        let draft = tx.draft().clone();
        commit_and_publish(tx, self.sink.as_ref()).await?;
        tracing::info!(%season_id, %draft_id, "season cancelled; draft cancelled");
        Ok(draft)
    }

    /// Allows picks to continue past the ceremony's draft lock.
    ///
    /// Appends `draft.lock.overridden` and records an audit entry after
    /// commit; a failed audit write is logged and does not fail the call.
    /// Overriding an already overridden draft changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::DraftNotActive`] for terminal drafts.
    pub async fn override_lock(&self, draft_id: DraftId) -> Result<Draft, DraftError> {
        let mut tx = self.store.begin(draft_id).await?;
        let now = self.clock.now();
        let draft = tx.draft();
        if draft.status.is_terminal() {
            return Err(draft.not_active(DraftStatus::InProgress));
        }
        if draft.allow_drafting_after_lock {
            return Ok(draft.clone());
        }

        let draft = tx.draft_mut();
        draft.allow_drafting_after_lock = true;
        draft.lock_override_at = Some(now);
        let status = draft.status;
        append_event(
            tx.as_mut(),
            DraftEventType::LockOverridden,
            json!({ "lock_override_at": now }),
            now,
        )
        .await?;
        let draft = tx.draft().clone();
        commit_and_publish(tx, self.sink.as_ref()).await?;
        tracing::warn!(%draft_id, %status, "ceremony draft lock overridden");

        let entry = AuditEntry {
            draft_id,
            action: "lock_override".to_string(),
            detail: json!({ "status": status, "version": draft.version }),
            recorded_at: now,
        };
        if let Err(e) = self.store.record_audit(entry).await {
            tracing::warn!(%draft_id, error = %e, "failed to record lock override audit");
        }
        Ok(draft)
    }

    /// Returns the draft with its seats, picks and turn on the clock.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::DraftNotFound`] if the draft does not exist.
    pub async fn snapshot(&self, draft_id: DraftId) -> Result<DraftSnapshot, DraftError> {
        let view = self.store.load_view(draft_id).await?;
        let turn = if view.draft.status == DraftStatus::InProgress && !view.draft.all_picks_made() {
            let assignment = view.draft.current_turn()?;
            view.seats
                .iter()
                .find(|seat| seat.seat_number == assignment.seat_number)
                .map(|seat| TurnInfo {
                    pick_number: assignment.pick_number,
                    round_number: assignment.round_number,
                    seat_number: assignment.seat_number,
                    participant_id: seat.participant_id,
                    deadline_at: view.draft.pick_deadline_at,
                })
        } else {
            None
        };
        Ok(DraftSnapshot {
            draft: view.draft,
            seats: view.seats,
            picks: view.picks,
            turn,
        })
    }

    /// Returns events after `after_version`, ascending, at most `limit`
    /// (capped by the configured page limit).
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::DraftNotFound`] if the draft does not exist.
    pub async fn events_since(
        &self,
        draft_id: DraftId,
        after_version: i64,
        limit: Option<i64>,
    ) -> Result<Vec<DraftEvent>, DraftError> {
        let limit = limit
            .unwrap_or(self.events_page_limit)
            .clamp(1, self.events_page_limit);
        self.store
            .events_since(draft_id, after_version.max(0), limit)
            .await
    }

    /// Reads a participant's autodraft settings.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::AutodraftConfigNotFound`] if none were saved.
    pub async fn get_autodraft(
        &self,
        draft_id: DraftId,
        participant_id: ParticipantId,
    ) -> Result<AutodraftConfig, DraftError> {
        self.store
            .autodraft_config(draft_id, participant_id)
            .await?
            .ok_or(DraftError::AutodraftConfigNotFound {
                draft_id,
                participant_id,
            })
    }

    /// Creates or replaces a participant's autodraft settings.
    ///
    /// # Errors
    ///
    /// - [`DraftError::DraftNotActive`] for terminal drafts.
    /// - [`DraftError::SeatNotFound`] if the participant has no seat (or,
    ///   before start, is not on the season roster).
    /// - [`DraftError::InvalidRequest`] for a `PLAN` without a plan the
    ///   participant owns.
    pub async fn set_autodraft(
        &self,
        draft_id: DraftId,
        participant_id: ParticipantId,
        settings: AutodraftSettings,
    ) -> Result<AutodraftConfig, DraftError> {
        let mut tx = self.store.begin(draft_id).await?;
        if tx.draft().status.is_terminal() {
            return Err(tx.draft().not_active(DraftStatus::InProgress));
        }

        let seated = if tx.draft().status == DraftStatus::Pending {
            tx.season_roster().await?.contains(&participant_id)
        } else {
            tx.seats()
                .await?
                .iter()
                .any(|seat| seat.participant_id == participant_id)
        };
        if !seated {
            return Err(DraftError::SeatNotFound {
                draft_id,
                participant_id,
            });
        }

        if settings.strategy == AutodraftStrategy::Plan {
            let plan_id = settings.plan_id.ok_or_else(|| {
                DraftError::InvalidRequest("PLAN strategy requires a plan_id".to_string())
            })?;
            let plan = tx
                .plan(plan_id)
                .await?
                .ok_or_else(|| DraftError::InvalidRequest(format!("plan {plan_id} not found")))?;
            if plan.participant_id != participant_id {
                return Err(DraftError::InvalidRequest(format!(
                    "plan {plan_id} belongs to another participant"
                )));
            }
        }

        let config = AutodraftConfig {
            draft_id,
            participant_id,
            enabled: settings.enabled,
            strategy: settings.strategy,
            plan_id: settings.plan_id,
            updated_at: self.clock.now(),
        };
        tx.put_autodraft_config(&config).await?;
        commit_and_publish(tx, self.sink.as_ref()).await?;
        tracing::info!(
            %draft_id,
            %participant_id,
            enabled = config.enabled,
            strategy = config.strategy.as_str(),
            "autodraft updated"
        );
        Ok(config)
    }

    /// Records nomination results for a completed draft.
    ///
    /// # Errors
    ///
    /// - [`DraftError::DraftNotActive`] unless the draft is `COMPLETED`.
    /// - [`DraftError::NominationNotFound`] /
    ///   [`DraftError::NominationNotInCeremony`] for foreign nominations.
    pub async fn upsert_results(
        &self,
        draft_id: DraftId,
        entries: &[ResultEntry],
    ) -> Result<Vec<DraftResult>, DraftError> {
        let mut tx = self.store.begin(draft_id).await?;
        let draft = tx.draft().clone();
        if draft.status != DraftStatus::Completed {
            return Err(draft.not_active(DraftStatus::Completed));
        }
        for entry in entries {
            let nomination = tx
                .nomination(entry.nomination_id)
                .await?
                .ok_or(DraftError::NominationNotFound(entry.nomination_id))?;
            if nomination.ceremony_id != draft.ceremony_id {
                return Err(DraftError::NominationNotInCeremony(entry.nomination_id));
            }
            tx.upsert_result(&DraftResult {
                draft_id,
                nomination_id: entry.nomination_id,
                won: entry.won,
                points: entry.points,
            })
            .await?;
        }
        commit_and_publish(tx, self.sink.as_ref()).await?;
        tracing::info!(%draft_id, results = entries.len(), "draft results recorded");
        self.store.results(draft_id).await
    }

    /// Computes standings: per participant, the points of their won picks.
    ///
    /// Ordered by points descending, then seat number.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::DraftNotFound`] if the draft does not exist.
    pub async fn standings(&self, draft_id: DraftId) -> Result<Vec<Standing>, DraftError> {
        let view = self.store.load_view(draft_id).await?;
        let results: HashMap<NominationId, DraftResult> = self
            .store
            .results(draft_id)
            .await?
            .into_iter()
            .map(|result| (result.nomination_id, result))
            .collect();

        let mut standings: Vec<Standing> = view
            .seats
            .iter()
            .map(|seat| {
                let won = view
                    .picks
                    .iter()
                    .filter(|pick| pick.participant_id == seat.participant_id)
                    .filter_map(|pick| results.get(&pick.nomination_id))
                    .filter(|result| result.won);
                let (wins, points) = won.fold((0_i32, 0_i64), |(wins, points), result| {
                    (wins.saturating_add(1), points.saturating_add(i64::from(result.points)))
                });
                Standing {
                    participant_id: seat.participant_id,
                    seat_number: seat.seat_number,
                    wins,
                    points,
                }
            })
            .collect();
        standings.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then_with(|| a.seat_number.cmp(&b.seat_number))
        });
        Ok(standings)
    }
}

fn cancel_in_tx(tx: &mut dyn DraftTx, now: DateTime<Utc>) -> Result<(), DraftError> {
    let draft = tx.draft_mut();
    draft.apply_transition(DraftStatus::Cancelled, now)?;
    draft.pick_deadline_at = None;
    draft.timer_remaining_ms = None;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{
        CeremonyId, DraftOrderType, DraftPlan, EventBus, ManualClock, Nomination,
        RemainderStrategy,
    };
    use crate::persistence::MemoryDraftStore;

    struct Fixture {
        store: Arc<MemoryDraftStore>,
        clock: ManualClock,
        service: DraftService,
        roster: Vec<ParticipantId>,
        draft_id: DraftId,
    }

    async fn fixture(seats: usize, pool: usize, new: impl FnOnce(&mut NewDraft)) -> Fixture {
        let store = Arc::new(MemoryDraftStore::new());
        let clock = ManualClock::new(Utc::now());
        let service = DraftService::new(
            Arc::clone(&store) as Arc<dyn DraftStore>,
            Arc::new(EventBus::new(64)),
            Arc::new(clock.clone()),
            10,
        );
        let season_id = SeasonId::new();
        let ceremony_id = CeremonyId::new();
        let roster: Vec<ParticipantId> = (0..seats).map(|_| ParticipantId::new()).collect();
        store.set_roster(season_id, roster.clone()).await;
        store
            .insert_nominations((0..pool).map(|i| Nomination {
                id: NominationId::new(),
                ceremony_id,
                category: "Best Score".to_string(),
                label: format!("Score {i}"),
            }))
            .await;

        let mut request = NewDraft {
            season_id,
            ceremony_id,
            order_type: DraftOrderType::Snake,
            picks_per_seat: 2,
            total_picks_override: None,
            remainder_strategy: RemainderStrategy::Undrafted,
            pick_timer_seconds: Some(45),
            auto_pick_seed: None,
        };
        new(&mut request);
        let Ok(draft) = service.create_draft(request).await else {
            panic!("create_draft failed");
        };
        Fixture {
            store,
            clock,
            service,
            roster,
            draft_id: draft.id,
        }
    }

    #[tokio::test]
    async fn create_rejects_non_positive_counts() {
        let store: Arc<dyn DraftStore> = Arc::new(MemoryDraftStore::new());
        let service = DraftService::new(
            store,
            Arc::new(EventBus::new(4)),
            Arc::new(ManualClock::new(Utc::now())),
            10,
        );
        let new = NewDraft {
            season_id: SeasonId::new(),
            ceremony_id: CeremonyId::new(),
            order_type: DraftOrderType::Snake,
            picks_per_seat: 0,
            total_picks_override: None,
            remainder_strategy: RemainderStrategy::Undrafted,
            pick_timer_seconds: None,
            auto_pick_seed: None,
        };
        let result = service.create_draft(new).await;
        assert!(matches!(result, Err(DraftError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn start_assigns_seats_in_roster_order() {
        let fx = fixture(3, 20, |_| {}).await;
        let Ok(draft) = fx.service.start_draft(fx.draft_id).await else {
            panic!("start failed");
        };
        assert_eq!(draft.status, DraftStatus::InProgress);
        assert_eq!(draft.seat_count, 3);
        assert_eq!(draft.total_required_picks, Some(6));
        assert_eq!(draft.current_pick_number, Some(1));
        assert_eq!(
            draft.pick_deadline_at,
            Some(fx.clock.now() + chrono::Duration::seconds(45))
        );

        let Ok(snapshot) = fx.service.snapshot(fx.draft_id).await else {
            panic!("snapshot failed");
        };
        let seated: Vec<ParticipantId> = snapshot.seats.iter().map(|s| s.participant_id).collect();
        assert_eq!(seated, fx.roster);
        let Some(turn) = snapshot.turn else {
            panic!("turn missing");
        };
        assert_eq!(turn.seat_number, 1);

        let again = fx.service.start_draft(fx.draft_id).await;
        assert!(matches!(again, Err(DraftError::DraftNotActive { .. })));
    }

    #[tokio::test]
    async fn total_picks_are_capped_by_the_pool() {
        let fx = fixture(4, 5, |_| {}).await;
        let Ok(draft) = fx.service.start_draft(fx.draft_id).await else {
            panic!("start failed");
        };
        assert_eq!(draft.total_required_picks, Some(5));
    }

    #[tokio::test]
    async fn empty_pool_completes_at_start() {
        let fx = fixture(2, 0, |_| {}).await;
        let Ok(draft) = fx.service.start_draft(fx.draft_id).await else {
            panic!("start failed");
        };
        assert_eq!(draft.status, DraftStatus::Completed);
        assert_eq!(draft.version, 2);
    }

    #[tokio::test]
    async fn resume_requires_a_paused_draft() {
        let fx = fixture(2, 8, |_| {}).await;
        let pending = fx.service.resume_draft(fx.draft_id).await;
        assert!(matches!(pending, Err(DraftError::DraftNotActive { .. })));

        let Ok(_) = fx.service.start_draft(fx.draft_id).await else {
            panic!("start failed");
        };
        let running = fx.service.resume_draft(fx.draft_id).await;
        assert!(matches!(running, Err(DraftError::SameStatus(_))));
    }

    #[tokio::test]
    async fn untimed_drafts_have_no_deadline() {
        let fx = fixture(2, 8, |new| new.pick_timer_seconds = None).await;
        let Ok(draft) = fx.service.start_draft(fx.draft_id).await else {
            panic!("start failed");
        };
        assert!(draft.pick_deadline_at.is_none());
        let Ok(paused) = fx.service.pause_draft(fx.draft_id).await else {
            panic!("pause failed");
        };
        assert!(paused.timer_remaining_ms.is_none());
    }

    #[tokio::test]
    async fn cancelled_drafts_reject_everything() {
        let fx = fixture(2, 8, |_| {}).await;
        let Ok(_) = fx.service.cancel_draft(fx.draft_id).await else {
            panic!("cancel failed");
        };
        assert!(fx.service.start_draft(fx.draft_id).await.is_err());
        assert!(fx.service.cancel_draft(fx.draft_id).await.is_err());
        assert!(fx.service.override_lock(fx.draft_id).await.is_err());
    }

    #[tokio::test]
    async fn autodraft_requires_a_seat_and_an_owned_plan() {
        let fx = fixture(2, 8, |_| {}).await;
        let Some(owner) = fx.roster.first().copied() else {
            panic!("empty roster");
        };
        let random = AutodraftSettings {
            enabled: true,
            strategy: AutodraftStrategy::Random,
            plan_id: None,
        };

        let outsider = fx
            .service
            .set_autodraft(fx.draft_id, ParticipantId::new(), random)
            .await;
        assert!(matches!(outsider, Err(DraftError::SeatNotFound { .. })));

        let missing_plan = AutodraftSettings {
            strategy: AutodraftStrategy::Plan,
            ..random
        };
        let result = fx.service.set_autodraft(fx.draft_id, owner, missing_plan).await;
        assert!(matches!(result, Err(DraftError::InvalidRequest(_))));

        let plan = DraftPlan {
            id: PlanId::new(),
            participant_id: ParticipantId::new(),
            entries: Vec::new(),
        };
        let plan_id = plan.id;
        fx.store.insert_plan(plan).await;
        let foreign = AutodraftSettings {
            plan_id: Some(plan_id),
            ..missing_plan
        };
        let result = fx.service.set_autodraft(fx.draft_id, owner, foreign).await;
        assert!(matches!(result, Err(DraftError::InvalidRequest(_))));

        let Ok(saved) = fx.service.set_autodraft(fx.draft_id, owner, random).await else {
            panic!("set_autodraft failed");
        };
        let Ok(read) = fx.service.get_autodraft(fx.draft_id, owner).await else {
            panic!("get_autodraft failed");
        };
        assert_eq!(read, saved);
    }

    #[tokio::test]
    async fn events_page_is_capped() {
        let fx = fixture(2, 8, |_| {}).await;
        let Ok(_) = fx.service.start_draft(fx.draft_id).await else {
            panic!("start failed");
        };
        let Ok(_) = fx.service.pause_draft(fx.draft_id).await else {
            panic!("pause failed");
        };
        let Ok(page) = fx.service.events_since(fx.draft_id, 0, Some(1_000)).await else {
            panic!("events_since failed");
        };
        assert_eq!(page.len(), 2);
        let Ok(one) = fx.service.events_since(fx.draft_id, 0, Some(0)).await else {
            panic!("events_since failed");
        };
        assert_eq!(one.len(), 1);
    }
}
