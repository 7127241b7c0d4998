//! PostgreSQL implementation of the persistence layer.
//!
//! A [`PgDraftTx`] is a database transaction that opened with
//! `SELECT … FOR UPDATE` on the draft row. Concurrent transactions on the
//! same draft queue on that row lock; the draft row is written back and the
//! transaction committed in [`DraftTx::commit`].
//!
//! Every appended event also issues `pg_notify` on [`NOTIFY_CHANNEL`] so
//! other instances can relay it to their own WebSocket clients. The
//! notification is delivered only if the transaction commits.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::models::{
    AUTODRAFT_COLUMNS, DRAFT_COLUMNS, EVENT_COLUMNS, PICK_COLUMNS, SEAT_COLUMNS,
    autodraft_from_row, ceremony_from_row, draft_from_row, event_from_row, nomination_from_row,
    pick_from_row, result_from_row, seat_from_row,
};
use super::{AuditEntry, DraftStore, DraftTx, DraftView, NewDraft};
use crate::domain::{
    AutodraftConfig, Ceremony, Draft, DraftEvent, DraftId, DraftPick, DraftPlan, DraftResult,
    DraftSeat, DraftStatus, Nomination, NominationId, ParticipantId, PlanId, SeasonId,
};
use crate::error::DraftError;

/// Channel carrying cross-instance event notifications.
pub const NOTIFY_CHANNEL: &str = "draft_events";

const DRAFT_SEASON_KEY: &str = "draft_season_key";
const PICK_NOMINATION_KEY: &str = "draft_pick_nomination_key";

/// PostgreSQL-backed draft store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PgDraftStore {
    pool: PgPool,
    instance_id: Uuid,
}

impl PgDraftStore {
    /// Creates a store with the given connection pool.
    ///
    /// `instance_id` tags outgoing notifications so this instance's relay
    /// can skip its own events.
    #[must_use]
    pub fn new(pool: PgPool, instance_id: Uuid) -> Self {
        Self { pool, instance_id }
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn ensure_draft(&self, draft_id: DraftId) -> Result<(), DraftError> {
        let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM draft WHERE id = $1")
            .bind(draft_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        exists
            .map(|_| ())
            .ok_or(DraftError::DraftNotFound(draft_id))
    }
}

fn unique_constraint(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Some(db.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

#[async_trait]
impl DraftStore for PgDraftStore {
    async fn create_draft(&self, new: NewDraft, now: DateTime<Utc>) -> Result<Draft, DraftError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO ceremony (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(new.ceremony_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        let sql = format!(
            "INSERT INTO draft (id, season_id, ceremony_id, status, order_type, picks_per_seat, \
             total_picks_override, remainder_strategy, pick_timer_seconds, auto_pick_seed, \
             created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {DRAFT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(DraftId::new().as_uuid())
            .bind(new.season_id.as_uuid())
            .bind(new.ceremony_id.as_uuid())
            .bind(DraftStatus::Pending.as_str())
            .bind(new.order_type.as_str())
            .bind(new.picks_per_seat)
            .bind(new.total_picks_override)
            .bind(new.remainder_strategy.as_str())
            .bind(new.pick_timer_seconds)
            .bind(new.auto_pick_seed)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(|err| match unique_constraint(&err).as_deref() {
                Some(DRAFT_SEASON_KEY) => DraftError::InvalidRequest(format!(
                    "season {} already has a draft",
                    new.season_id
                )),
                _ => err.into(),
            })?;
        let draft = draft_from_row(&row)?;
        tx.commit().await?;
        Ok(draft)
    }

    async fn begin(&self, draft_id: DraftId) -> Result<Box<dyn DraftTx>, DraftError> {
        let mut tx = self.pool.begin().await?;
        let sql = format!("SELECT {DRAFT_COLUMNS} FROM draft WHERE id = $1 FOR UPDATE");
        let row = sqlx::query(&sql)
            .bind(draft_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DraftError::DraftNotFound(draft_id))?;
        let draft = draft_from_row(&row)?;
        Ok(Box::new(PgDraftTx {
            tx,
            draft,
            instance_id: self.instance_id,
            appended: Vec::new(),
        }))
    }

    async fn load_view(&self, draft_id: DraftId) -> Result<DraftView, DraftError> {
        let sql = format!("SELECT {DRAFT_COLUMNS} FROM draft WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(draft_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DraftError::DraftNotFound(draft_id))?;
        let draft = draft_from_row(&row)?;

        let sql =
            format!("SELECT {SEAT_COLUMNS} FROM draft_seat WHERE draft_id = $1 ORDER BY seat_number");
        let seats = sqlx::query(&sql)
            .bind(draft_id.as_uuid())
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(seat_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let sql =
            format!("SELECT {PICK_COLUMNS} FROM draft_pick WHERE draft_id = $1 ORDER BY pick_number");
        let picks = sqlx::query(&sql)
            .bind(draft_id.as_uuid())
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(pick_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DraftView {
            draft,
            seats,
            picks,
        })
    }

    async fn draft_for_season(&self, season_id: SeasonId) -> Result<Option<DraftId>, DraftError> {
        let id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM draft WHERE season_id = $1")
            .bind(season_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(id.map(DraftId::from_uuid))
    }

    async fn events_since(
        &self,
        draft_id: DraftId,
        after_version: i64,
        limit: i64,
    ) -> Result<Vec<DraftEvent>, DraftError> {
        self.ensure_draft(draft_id).await?;
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM draft_event WHERE draft_id = $1 AND version > $2 \
             ORDER BY version ASC LIMIT $3"
        );
        sqlx::query(&sql)
            .bind(draft_id.as_uuid())
            .bind(after_version)
            .bind(limit.max(0))
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(event_from_row)
            .collect()
    }

    async fn overdue_drafts(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<DraftId>, DraftError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM draft WHERE status = $1 AND pick_deadline_at <= $2 \
             ORDER BY pick_deadline_at ASC LIMIT $3",
        )
        .bind(DraftStatus::InProgress.as_str())
        .bind(now)
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        Ok(ids.into_iter().map(DraftId::from_uuid).collect())
    }

    async fn autodraft_config(
        &self,
        draft_id: DraftId,
        participant_id: ParticipantId,
    ) -> Result<Option<AutodraftConfig>, DraftError> {
        self.ensure_draft(draft_id).await?;
        let sql = format!(
            "SELECT {AUTODRAFT_COLUMNS} FROM draft_autodraft \
             WHERE draft_id = $1 AND participant_id = $2"
        );
        sqlx::query(&sql)
            .bind(draft_id.as_uuid())
            .bind(participant_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(autodraft_from_row)
            .transpose()
    }

    async fn results(&self, draft_id: DraftId) -> Result<Vec<DraftResult>, DraftError> {
        self.ensure_draft(draft_id).await?;
        sqlx::query(
            "SELECT draft_id, nomination_id, won, points FROM draft_result \
             WHERE draft_id = $1 ORDER BY nomination_id",
        )
        .bind(draft_id.as_uuid())
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(result_from_row)
        .collect()
    }

    async fn record_audit(&self, entry: AuditEntry) -> Result<(), DraftError> {
        sqlx::query(
            "INSERT INTO draft_audit (draft_id, action, detail, recorded_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(entry.draft_id.as_uuid())
        .bind(&entry.action)
        .bind(&entry.detail)
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// An open draft transaction holding the row lock.
struct PgDraftTx {
    tx: Transaction<'static, Postgres>,
    draft: Draft,
    instance_id: Uuid,
    appended: Vec<DraftEvent>,
}

impl fmt::Debug for PgDraftTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgDraftTx")
            .field("draft_id", &self.draft.id)
            .field("version", &self.draft.version)
            .field("appended", &self.appended.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DraftTx for PgDraftTx {
    fn draft(&self) -> &Draft {
        &self.draft
    }

    fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }

    async fn ceremony(&mut self) -> Result<Ceremony, DraftError> {
        let row = sqlx::query("SELECT id, draft_locked_at FROM ceremony WHERE id = $1")
            .bind(self.draft.ceremony_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
            .ok_or_else(|| {
                DraftError::Internal(format!("ceremony {} missing", self.draft.ceremony_id))
            })?;
        ceremony_from_row(&row)
    }

    async fn season_roster(&mut self) -> Result<Vec<ParticipantId>, DraftError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT participant_id FROM season_member WHERE season_id = $1 ORDER BY position",
        )
        .bind(self.draft.season_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(ids.into_iter().map(ParticipantId::from_uuid).collect())
    }

    async fn seats(&mut self) -> Result<Vec<DraftSeat>, DraftError> {
        let sql =
            format!("SELECT {SEAT_COLUMNS} FROM draft_seat WHERE draft_id = $1 ORDER BY seat_number");
        sqlx::query(&sql)
            .bind(self.draft.id.as_uuid())
            .fetch_all(&mut *self.tx)
            .await?
            .iter()
            .map(seat_from_row)
            .collect()
    }

    async fn insert_seats(&mut self, seats: &[DraftSeat]) -> Result<(), DraftError> {
        for seat in seats {
            sqlx::query(
                "INSERT INTO draft_seat (draft_id, seat_number, participant_id, is_active) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(seat.draft_id.as_uuid())
            .bind(seat.seat_number)
            .bind(seat.participant_id.as_uuid())
            .bind(seat.is_active)
            .execute(&mut *self.tx)
            .await?;
        }
        Ok(())
    }

    async fn pick_by_token(&mut self, token: &str) -> Result<Option<DraftPick>, DraftError> {
        let sql = format!(
            "SELECT {PICK_COLUMNS} FROM draft_pick WHERE draft_id = $1 AND idempotency_token = $2"
        );
        sqlx::query(&sql)
            .bind(self.draft.id.as_uuid())
            .bind(token)
            .fetch_optional(&mut *self.tx)
            .await?
            .as_ref()
            .map(pick_from_row)
            .transpose()
    }

    async fn nomination(&mut self, id: NominationId) -> Result<Option<Nomination>, DraftError> {
        sqlx::query("SELECT id, ceremony_id, category, label FROM nomination WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
            .as_ref()
            .map(nomination_from_row)
            .transpose()
    }

    async fn nomination_count(&mut self) -> Result<i32, DraftError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM nomination WHERE ceremony_id = $1")
            .bind(self.draft.ceremony_id.as_uuid())
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(i32::try_from(count).unwrap_or(i32::MAX))
    }

    async fn is_drafted(&mut self, id: NominationId) -> Result<bool, DraftError> {
        let found: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM draft_pick WHERE draft_id = $1 AND nomination_id = $2",
        )
        .bind(self.draft.id.as_uuid())
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(found.is_some())
    }

    async fn undrafted_nominations(&mut self) -> Result<Vec<NominationId>, DraftError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT n.id FROM nomination n WHERE n.ceremony_id = $1 AND NOT EXISTS \
             (SELECT 1 FROM draft_pick p WHERE p.draft_id = $2 AND p.nomination_id = n.id) \
             ORDER BY n.id",
        )
        .bind(self.draft.ceremony_id.as_uuid())
        .bind(self.draft.id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(ids.into_iter().map(NominationId::from_uuid).collect())
    }

    async fn insert_pick(&mut self, pick: &DraftPick) -> Result<(), DraftError> {
        sqlx::query(
            "INSERT INTO draft_pick (draft_id, pick_number, round_number, seat_number, \
             participant_id, nomination_id, made_at, idempotency_token) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(pick.draft_id.as_uuid())
        .bind(pick.pick_number)
        .bind(pick.round_number)
        .bind(pick.seat_number)
        .bind(pick.participant_id.as_uuid())
        .bind(pick.nomination_id.as_uuid())
        .bind(pick.made_at)
        .bind(pick.idempotency_token.as_deref())
        .execute(&mut *self.tx)
        .await
        .map_err(|err| match unique_constraint(&err).as_deref() {
            Some(PICK_NOMINATION_KEY) => DraftError::NominationTaken(pick.nomination_id),
            Some(_) => DraftError::PickConflict {
                draft_id: pick.draft_id,
                pick_number: pick.pick_number,
            },
            None => err.into(),
        })?;
        Ok(())
    }

    async fn insert_event(&mut self, event: &DraftEvent) -> Result<(), DraftError> {
        sqlx::query(
            "INSERT INTO draft_event (draft_id, version, event_type, payload, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(event.draft_id.as_uuid())
        .bind(event.version)
        .bind(event.event_type.as_str())
        .bind(&event.payload)
        .bind(event.created_at)
        .execute(&mut *self.tx)
        .await?;

        let notice = serde_json::json!({
            "origin": self.instance_id,
            "draft_id": event.draft_id,
            "version": event.version,
        });
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(NOTIFY_CHANNEL)
            .bind(notice.to_string())
            .execute(&mut *self.tx)
            .await?;

        self.appended.push(event.clone());
        Ok(())
    }

    async fn autodraft_config(
        &mut self,
        participant_id: ParticipantId,
    ) -> Result<Option<AutodraftConfig>, DraftError> {
        let sql = format!(
            "SELECT {AUTODRAFT_COLUMNS} FROM draft_autodraft \
             WHERE draft_id = $1 AND participant_id = $2"
        );
        sqlx::query(&sql)
            .bind(self.draft.id.as_uuid())
            .bind(participant_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
            .as_ref()
            .map(autodraft_from_row)
            .transpose()
    }

    async fn put_autodraft_config(&mut self, config: &AutodraftConfig) -> Result<(), DraftError> {
        sqlx::query(
            "INSERT INTO draft_autodraft (draft_id, participant_id, enabled, strategy, plan_id, \
             updated_at) VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (draft_id, participant_id) DO UPDATE SET enabled = EXCLUDED.enabled, \
             strategy = EXCLUDED.strategy, plan_id = EXCLUDED.plan_id, \
             updated_at = EXCLUDED.updated_at",
        )
        .bind(config.draft_id.as_uuid())
        .bind(config.participant_id.as_uuid())
        .bind(config.enabled)
        .bind(config.strategy.as_str())
        .bind(config.plan_id.map(Uuid::from))
        .bind(config.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn plan(&mut self, plan_id: PlanId) -> Result<Option<DraftPlan>, DraftError> {
        let owner: Option<Uuid> =
            sqlx::query_scalar("SELECT participant_id FROM draft_plan WHERE id = $1")
                .bind(plan_id.as_uuid())
                .fetch_optional(&mut *self.tx)
                .await?;
        let Some(owner) = owner else {
            return Ok(None);
        };
        let entries: Vec<Uuid> = sqlx::query_scalar(
            "SELECT nomination_id FROM draft_plan_entry WHERE plan_id = $1 ORDER BY rank",
        )
        .bind(plan_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(Some(DraftPlan {
            id: plan_id,
            participant_id: owner.into(),
            entries: entries.into_iter().map(NominationId::from_uuid).collect(),
        }))
    }

    async fn upsert_result(&mut self, result: &DraftResult) -> Result<(), DraftError> {
        sqlx::query(
            "INSERT INTO draft_result (draft_id, nomination_id, won, points) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (draft_id, nomination_id) \
             DO UPDATE SET won = EXCLUDED.won, points = EXCLUDED.points",
        )
        .bind(result.draft_id.as_uuid())
        .bind(result.nomination_id.as_uuid())
        .bind(result.won)
        .bind(result.points)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<Vec<DraftEvent>, DraftError> {
        let Self {
            mut tx,
            draft,
            appended,
            ..
        } = *self;
        sqlx::query(
            "UPDATE draft SET status = $2, seat_count = $3, total_required_picks = $4, \
             current_pick_number = $5, pick_deadline_at = $6, timer_remaining_ms = $7, \
             allow_drafting_after_lock = $8, lock_override_at = $9, version = $10, \
             started_at = $11, completed_at = $12 WHERE id = $1",
        )
        .bind(draft.id.as_uuid())
        .bind(draft.status.as_str())
        .bind(draft.seat_count)
        .bind(draft.total_required_picks)
        .bind(draft.current_pick_number)
        .bind(draft.pick_deadline_at)
        .bind(draft.timer_remaining_ms)
        .bind(draft.allow_drafting_after_lock)
        .bind(draft.lock_override_at)
        .bind(draft.version)
        .bind(draft.started_at)
        .bind(draft.completed_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(appended)
    }
}
