//! Draft aggregate, its seats and picks, and the catalog types it references.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::state_machine::{self, Transition};
use super::turn_order::{self, TurnAssignment};
use super::{CeremonyId, DraftId, NominationId, ParticipantId, PlanId, SeasonId};
use crate::error::DraftError;

/// Lifecycle status of a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftStatus {
    /// Created at season setup, not started yet.
    Pending,
    /// Picks are being made.
    InProgress,
    /// Temporarily halted; the pick timer is frozen.
    Paused,
    /// All required picks were made.
    Completed,
    /// Abandoned; terminal.
    Cancelled,
}

impl DraftStatus {
    /// Returns the canonical string form stored in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Paused => "PAUSED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Returns `true` for states no transition can leave.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DraftStatus {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "PAUSED" => Ok(Self::Paused),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(DraftError::UnknownStatus(other.to_string())),
        }
    }
}

/// How seats rotate between rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftOrderType {
    /// Direction reverses every round.
    Snake,
    /// Same direction every round. Recognised but not supported.
    Linear,
}

impl DraftOrderType {
    /// Returns the canonical string form stored in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Snake => "SNAKE",
            Self::Linear => "LINEAR",
        }
    }
}

impl fmt::Display for DraftOrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DraftOrderType {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SNAKE" => Ok(Self::Snake),
            "LINEAR" => Ok(Self::Linear),
            other => Err(DraftError::InvalidRequest(format!(
                "unknown draft order type: {other}"
            ))),
        }
    }
}

/// What happens to nominations left over once every seat has its quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemainderStrategy {
    /// Leftover nominations stay undrafted.
    Undrafted,
    /// Keep drafting until the ceremony's pool is exhausted.
    FullPool,
}

impl RemainderStrategy {
    /// Returns the canonical string form stored in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Undrafted => "UNDRAFTED",
            Self::FullPool => "FULL_POOL",
        }
    }
}

impl FromStr for RemainderStrategy {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UNDRAFTED" => Ok(Self::Undrafted),
            "FULL_POOL" => Ok(Self::FullPool),
            other => Err(DraftError::InvalidRequest(format!(
                "unknown remainder strategy: {other}"
            ))),
        }
    }
}

/// A draft: one per league season.
///
/// All mutation happens inside a per-draft transaction (see
/// [`crate::persistence::DraftTx`]); the methods here are pure helpers over
/// the row's fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Draft {
    /// Draft identifier.
    pub id: DraftId,
    /// Owning season.
    pub season_id: SeasonId,
    /// Ceremony whose nominations are drafted.
    pub ceremony_id: CeremonyId,
    /// Lifecycle status.
    pub status: DraftStatus,
    /// Turn order type.
    pub order_type: DraftOrderType,
    /// Number of seats, fixed when the draft starts (0 before).
    pub seat_count: i32,
    /// Picks each seat makes.
    pub picks_per_seat: i32,
    /// Explicit total-picks override, if the commissioner set one.
    pub total_picks_override: Option<i32>,
    /// Treatment of leftover nominations.
    pub remainder_strategy: RemainderStrategy,
    /// Total picks required to complete, fixed when the draft starts.
    pub total_required_picks: Option<i32>,
    /// Pick currently on the clock (1-based), set when the draft starts.
    pub current_pick_number: Option<i32>,
    /// Seconds each seat has to pick, if the draft is timed.
    pub pick_timer_seconds: Option<i32>,
    /// When the seat on the clock runs out of time.
    pub pick_deadline_at: Option<DateTime<Utc>>,
    /// Remaining timer budget frozen by a pause, in milliseconds.
    pub timer_remaining_ms: Option<i64>,
    /// Seed for reproducible autodraft choices.
    pub auto_pick_seed: Option<i64>,
    /// Whether picks may continue past the ceremony's draft lock.
    pub allow_drafting_after_lock: bool,
    /// When the lock override was applied.
    pub lock_override_at: Option<DateTime<Utc>>,
    /// Version of the last event appended for this draft.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// First time the draft entered `IN_PROGRESS`.
    pub started_at: Option<DateTime<Utc>>,
    /// When the draft reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Draft {
    /// Returns the pick timer as a [`Duration`], if the draft is timed.
    #[must_use]
    pub fn pick_timer(&self) -> Option<Duration> {
        self.pick_timer_seconds
            .filter(|secs| *secs > 0)
            .map(|secs| Duration::seconds(i64::from(secs)))
    }

    /// Returns the deadline a fresh turn starting at `now` would get.
    #[must_use]
    pub fn fresh_deadline(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.pick_timer().map(|timer| now + timer)
    }

    /// Computes the seat and round currently on the clock.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::DraftNotActive`] if the draft is not
    /// `IN_PROGRESS`, or a validation error from [`turn_order::seat_for_pick`].
    pub fn current_turn(&self) -> Result<TurnAssignment, DraftError> {
        if self.status != DraftStatus::InProgress {
            return Err(self.not_active(DraftStatus::InProgress));
        }
        let pick_number = self.current_pick_number.unwrap_or(0);
        turn_order::seat_for_pick(self.seat_count, pick_number, self.order_type)
    }

    /// Returns `true` once every required pick has been made.
    #[must_use]
    pub fn all_picks_made(&self) -> bool {
        match (self.current_pick_number, self.total_required_picks) {
            (Some(current), Some(total)) => current > total,
            _ => false,
        }
    }

    /// Returns `true` if the deadline has elapsed at `now`.
    #[must_use]
    pub fn deadline_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.pick_deadline_at.is_some_and(|deadline| deadline <= now)
    }

    /// Computes the total picks this draft requires given the seat count and
    /// the size of the ceremony's nomination pool.
    #[must_use]
    pub fn required_picks(&self, seat_count: i32, pool_size: i32) -> i32 {
        let planned = match self.remainder_strategy {
            RemainderStrategy::FullPool => pool_size,
            RemainderStrategy::Undrafted => self
                .total_picks_override
                .unwrap_or_else(|| seat_count.saturating_mul(self.picks_per_seat)),
        };
        planned.min(pool_size).max(0)
    }

    /// Validates and applies a lifecycle transition, stamping timestamps.
    ///
    /// # Errors
    ///
    /// Returns the state machine's error when the transition is illegal.
    pub fn apply_transition(
        &mut self,
        requested: DraftStatus,
        now: DateTime<Utc>,
    ) -> Result<Transition, DraftError> {
        let transition = state_machine::transition(self.status, requested, self.started_at, now)?;
        self.status = transition.next;
        self.started_at = transition.started_at;
        if transition.completed_at.is_some() {
            self.completed_at = transition.completed_at;
        }
        Ok(transition)
    }

    /// Builds the state conflict error for an operation requiring `expected`.
    #[must_use]
    pub fn not_active(&self, expected: DraftStatus) -> DraftError {
        DraftError::DraftNotActive {
            draft_id: self.id,
            status: self.status,
            expected,
        }
    }
}

/// A participant's slot in a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DraftSeat {
    /// Owning draft.
    pub draft_id: DraftId,
    /// Seat number, 1..N contiguous.
    pub seat_number: i32,
    /// Participant holding the seat.
    pub participant_id: ParticipantId,
    /// Whether the participant is still active in the draft.
    pub is_active: bool,
}

/// A completed pick. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DraftPick {
    /// Owning draft.
    pub draft_id: DraftId,
    /// Pick number, 1..total contiguous.
    pub pick_number: i32,
    /// Round number, `ceil(pick_number / seat_count)`.
    pub round_number: i32,
    /// Seat that made the pick.
    pub seat_number: i32,
    /// Participant that owns the seat.
    pub participant_id: ParticipantId,
    /// Nomination selected.
    pub nomination_id: NominationId,
    /// When the pick was made.
    pub made_at: DateTime<Utc>,
    /// Client-supplied idempotency token, if any.
    pub idempotency_token: Option<String>,
}

/// Ceremony metadata the engine needs: its draft lock boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Ceremony {
    /// Ceremony identifier.
    pub id: CeremonyId,
    /// Picks are rejected from this instant unless the draft overrides it.
    pub draft_locked_at: Option<DateTime<Utc>>,
}

impl Ceremony {
    /// Returns `true` if the draft lock has passed at `now`.
    #[must_use]
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.draft_locked_at.is_some_and(|locked| locked <= now)
    }
}

/// A draftable catalog entry. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Nomination {
    /// Nomination identifier.
    pub id: NominationId,
    /// Ceremony the nomination belongs to.
    pub ceremony_id: CeremonyId,
    /// Category label.
    pub category: String,
    /// Display label.
    pub label: String,
}

/// A participant's ranked list of nominations for PLAN autodraft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DraftPlan {
    /// Plan identifier.
    pub id: PlanId,
    /// Participant who authored the plan.
    pub participant_id: ParticipantId,
    /// Nominations in preference order, best first.
    pub entries: Vec<NominationId>,
}

/// Strategy an autodraft seat uses to choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutodraftStrategy {
    /// Uniform over undrafted nominations.
    Random,
    /// Walk the participant's ranked plan.
    Plan,
}

impl AutodraftStrategy {
    /// Returns the canonical string form stored in the database.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Random => "RANDOM",
            Self::Plan => "PLAN",
        }
    }
}

impl FromStr for AutodraftStrategy {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RANDOM" => Ok(Self::Random),
            "PLAN" => Ok(Self::Plan),
            other => Err(DraftError::InvalidRequest(format!(
                "unknown autodraft strategy: {other}"
            ))),
        }
    }
}

/// Per-participant autodraft settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AutodraftConfig {
    /// Owning draft.
    pub draft_id: DraftId,
    /// Participant the settings apply to.
    pub participant_id: ParticipantId,
    /// Whether the engine picks for this participant on deadline.
    pub enabled: bool,
    /// Selection strategy.
    pub strategy: AutodraftStrategy,
    /// Ranked plan used by [`AutodraftStrategy::Plan`].
    pub plan_id: Option<PlanId>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Post-draft outcome of a nomination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DraftResult {
    /// Owning draft.
    pub draft_id: DraftId,
    /// Nomination the result is for.
    pub nomination_id: NominationId,
    /// Whether the nomination won.
    pub won: bool,
    /// Points awarded.
    pub points: i32,
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn pending_draft() -> Draft {
        Draft {
            id: DraftId::new(),
            season_id: SeasonId::new(),
            ceremony_id: CeremonyId::new(),
            status: DraftStatus::Pending,
            order_type: DraftOrderType::Snake,
            seat_count: 0,
            picks_per_seat: 3,
            total_picks_override: None,
            remainder_strategy: RemainderStrategy::Undrafted,
            total_required_picks: None,
            current_pick_number: None,
            pick_timer_seconds: Some(30),
            pick_deadline_at: None,
            timer_remaining_ms: None,
            auto_pick_seed: Some(7),
            allow_drafting_after_lock: false,
            lock_override_at: None,
            version: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            DraftStatus::Pending,
            DraftStatus::InProgress,
            DraftStatus::Paused,
            DraftStatus::Completed,
            DraftStatus::Cancelled,
        ] {
            let parsed: Result<DraftStatus, _> = status.as_str().parse();
            assert!(matches!(parsed, Ok(s) if s == status));
        }
    }

    #[test]
    fn unknown_status_is_reported() {
        let parsed = "DRAFTING".parse::<DraftStatus>();
        assert!(matches!(parsed, Err(DraftError::UnknownStatus(s)) if s == "DRAFTING"));
    }

    #[test]
    fn current_turn_on_pending_draft_is_state_error() {
        let draft = pending_draft();
        let result = draft.current_turn();
        assert!(matches!(result, Err(DraftError::DraftNotActive { .. })));
    }

    #[test]
    fn current_turn_with_bad_seat_count_is_validation_error() {
        let mut draft = pending_draft();
        draft.status = DraftStatus::InProgress;
        draft.current_pick_number = Some(1);
        draft.seat_count = 0;
        let result = draft.current_turn();
        assert!(matches!(result, Err(DraftError::InvalidTurnInput { .. })));
    }

    #[test]
    fn required_picks_respects_override_and_pool() {
        let mut draft = pending_draft();
        assert_eq!(draft.required_picks(4, 100), 12);
        draft.total_picks_override = Some(10);
        assert_eq!(draft.required_picks(4, 100), 10);
        assert_eq!(draft.required_picks(4, 6), 6);
        draft.remainder_strategy = RemainderStrategy::FullPool;
        assert_eq!(draft.required_picks(4, 23), 23);
    }

    #[test]
    fn resume_keeps_original_start_time() {
        let mut draft = pending_draft();
        let t0 = Utc::now();
        let Ok(_) = draft.apply_transition(DraftStatus::InProgress, t0) else {
            panic!("start failed");
        };
        let t1 = t0 + Duration::seconds(5);
        let Ok(_) = draft.apply_transition(DraftStatus::Paused, t1) else {
            panic!("pause failed");
        };
        let Ok(_) = draft.apply_transition(DraftStatus::InProgress, t1 + Duration::seconds(5))
        else {
            panic!("resume failed");
        };
        assert_eq!(draft.started_at, Some(t0));
        assert_eq!(draft.completed_at, None);
    }

    #[test]
    fn ceremony_lock_boundary() {
        let now = Utc::now();
        let ceremony = Ceremony {
            id: CeremonyId::new(),
            draft_locked_at: Some(now),
        };
        assert!(ceremony.is_locked(now));
        assert!(!ceremony.is_locked(now - Duration::seconds(1)));
    }
}
