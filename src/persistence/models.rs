//! Row decoding for the Postgres store.
//!
//! Enum columns are stored as `TEXT` holding the canonical `as_str` form,
//! so every decoder parses them back through `FromStr`.

use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::domain::{
    AutodraftConfig, Ceremony, Draft, DraftEvent, DraftPick, DraftResult, DraftSeat, Nomination,
};
use crate::error::DraftError;

/// Column list matching [`draft_from_row`].
pub const DRAFT_COLUMNS: &str = concat!(
    "id, season_id, ceremony_id, status, order_type, seat_count, picks_per_seat, ",
    "total_picks_override, remainder_strategy, total_required_picks, current_pick_number, ",
    "pick_timer_seconds, pick_deadline_at, timer_remaining_ms, auto_pick_seed, ",
    "allow_drafting_after_lock, lock_override_at, version, created_at, started_at, completed_at"
);

/// Column list matching [`seat_from_row`].
pub const SEAT_COLUMNS: &str = "draft_id, seat_number, participant_id, is_active";

/// Column list matching [`pick_from_row`].
pub const PICK_COLUMNS: &str = concat!(
    "draft_id, pick_number, round_number, seat_number, participant_id, nomination_id, ",
    "made_at, idempotency_token"
);

/// Column list matching [`event_from_row`].
pub const EVENT_COLUMNS: &str = "draft_id, version, event_type, payload, created_at";

/// Column list matching [`autodraft_from_row`].
pub const AUTODRAFT_COLUMNS: &str = "draft_id, participant_id, enabled, strategy, plan_id, updated_at";

/// Decodes a `draft` row.
///
/// # Errors
///
/// Returns a persistence error on a missing column or an unknown enum value.
pub fn draft_from_row(row: &PgRow) -> Result<Draft, DraftError> {
    let status: String = row.try_get("status")?;
    let order_type: String = row.try_get("order_type")?;
    let remainder_strategy: String = row.try_get("remainder_strategy")?;
    Ok(Draft {
        id: row.try_get::<Uuid, _>("id")?.into(),
        season_id: row.try_get::<Uuid, _>("season_id")?.into(),
        ceremony_id: row.try_get::<Uuid, _>("ceremony_id")?.into(),
        status: status.parse()?,
        order_type: order_type.parse()?,
        seat_count: row.try_get("seat_count")?,
        picks_per_seat: row.try_get("picks_per_seat")?,
        total_picks_override: row.try_get("total_picks_override")?,
        remainder_strategy: remainder_strategy.parse()?,
        total_required_picks: row.try_get("total_required_picks")?,
        current_pick_number: row.try_get("current_pick_number")?,
        pick_timer_seconds: row.try_get("pick_timer_seconds")?,
        pick_deadline_at: row.try_get("pick_deadline_at")?,
        timer_remaining_ms: row.try_get("timer_remaining_ms")?,
        auto_pick_seed: row.try_get("auto_pick_seed")?,
        allow_drafting_after_lock: row.try_get("allow_drafting_after_lock")?,
        lock_override_at: row.try_get("lock_override_at")?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

/// Decodes a `draft_seat` row.
///
/// # Errors
///
/// Returns a persistence error on a missing column.
pub fn seat_from_row(row: &PgRow) -> Result<DraftSeat, DraftError> {
    Ok(DraftSeat {
        draft_id: row.try_get::<Uuid, _>("draft_id")?.into(),
        seat_number: row.try_get("seat_number")?,
        participant_id: row.try_get::<Uuid, _>("participant_id")?.into(),
        is_active: row.try_get("is_active")?,
    })
}

/// Decodes a `draft_pick` row.
///
/// # Errors
///
/// Returns a persistence error on a missing column.
pub fn pick_from_row(row: &PgRow) -> Result<DraftPick, DraftError> {
    Ok(DraftPick {
        draft_id: row.try_get::<Uuid, _>("draft_id")?.into(),
        pick_number: row.try_get("pick_number")?,
        round_number: row.try_get("round_number")?,
        seat_number: row.try_get("seat_number")?,
        participant_id: row.try_get::<Uuid, _>("participant_id")?.into(),
        nomination_id: row.try_get::<Uuid, _>("nomination_id")?.into(),
        made_at: row.try_get("made_at")?,
        idempotency_token: row.try_get("idempotency_token")?,
    })
}

/// Decodes a `draft_event` row.
///
/// # Errors
///
/// Returns a persistence error on a missing column or an unknown event type.
pub fn event_from_row(row: &PgRow) -> Result<DraftEvent, DraftError> {
    let event_type: String = row.try_get("event_type")?;
    Ok(DraftEvent {
        draft_id: row.try_get::<Uuid, _>("draft_id")?.into(),
        version: row.try_get("version")?,
        event_type: event_type.parse()?,
        payload: row.try_get("payload")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Decodes a `draft_autodraft` row.
///
/// # Errors
///
/// Returns a persistence error on a missing column or an unknown strategy.
pub fn autodraft_from_row(row: &PgRow) -> Result<AutodraftConfig, DraftError> {
    let strategy: String = row.try_get("strategy")?;
    Ok(AutodraftConfig {
        draft_id: row.try_get::<Uuid, _>("draft_id")?.into(),
        participant_id: row.try_get::<Uuid, _>("participant_id")?.into(),
        enabled: row.try_get("enabled")?,
        strategy: strategy.parse()?,
        plan_id: row.try_get::<Option<Uuid>, _>("plan_id")?.map(Into::into),
        updated_at: row.try_get("updated_at")?,
    })
}

/// Decodes a `ceremony` row.
///
/// # Errors
///
/// Returns a persistence error on a missing column.
pub fn ceremony_from_row(row: &PgRow) -> Result<Ceremony, DraftError> {
    Ok(Ceremony {
        id: row.try_get::<Uuid, _>("id")?.into(),
        draft_locked_at: row.try_get("draft_locked_at")?,
    })
}

/// Decodes a `nomination` row.
///
/// # Errors
///
/// Returns a persistence error on a missing column.
pub fn nomination_from_row(row: &PgRow) -> Result<Nomination, DraftError> {
    Ok(Nomination {
        id: row.try_get::<Uuid, _>("id")?.into(),
        ceremony_id: row.try_get::<Uuid, _>("ceremony_id")?.into(),
        category: row.try_get("category")?,
        label: row.try_get("label")?,
    })
}

/// Decodes a `draft_result` row.
///
/// # Errors
///
/// Returns a persistence error on a missing column.
pub fn result_from_row(row: &PgRow) -> Result<DraftResult, DraftError> {
    Ok(DraftResult {
        draft_id: row.try_get::<Uuid, _>("draft_id")?.into(),
        nomination_id: row.try_get::<Uuid, _>("nomination_id")?.into(),
        won: row.try_get("won")?,
        points: row.try_get("points")?,
    })
}
