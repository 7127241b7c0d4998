//! Persistence layer: per-draft transactions, the event log, and the
//! cluster mutex.
//!
//! [`DraftStore`] is the entry point. Every mutation of a draft goes
//! through a [`DraftTx`] obtained from [`DraftStore::begin`], which holds the
//! draft's exclusive lock until it is committed or dropped. Dropping a
//! transaction without committing discards every write made through it.
//!
//! Two implementations exist: [`memory::MemoryDraftStore`] (per-draft
//! `tokio` mutexes, used by tests and single-node runs) and
//! [`postgres::PgDraftStore`] (`SELECT … FOR UPDATE` transactions).

pub mod cluster_mutex;
pub mod listener;
pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    AutodraftConfig, Ceremony, CeremonyId, Draft, DraftEvent, DraftEventType, DraftId,
    DraftOrderType, DraftPick, DraftPlan, DraftResult, DraftSeat, Nomination, NominationId,
    ParticipantId, PlanId, RemainderStrategy, SeasonId,
};
use crate::error::DraftError;

pub use cluster_mutex::{ClusterLease, ClusterMutex, MemoryClusterMutex, PgClusterMutex};
pub use memory::MemoryDraftStore;
pub use postgres::PgDraftStore;

/// Parameters for creating a draft at season setup.
#[derive(Debug, Clone)]
pub struct NewDraft {
    /// Owning season; one draft per season.
    pub season_id: SeasonId,
    /// Ceremony whose nominations are drafted.
    pub ceremony_id: CeremonyId,
    /// Turn order type.
    pub order_type: DraftOrderType,
    /// Picks each seat makes.
    pub picks_per_seat: i32,
    /// Optional explicit total.
    pub total_picks_override: Option<i32>,
    /// Treatment of leftover nominations.
    pub remainder_strategy: RemainderStrategy,
    /// Seconds per pick, if timed.
    pub pick_timer_seconds: Option<i32>,
    /// Seed for reproducible autodraft choices.
    pub auto_pick_seed: Option<i64>,
}

/// Read-only view of a draft with its seats and picks.
#[derive(Debug, Clone)]
pub struct DraftView {
    /// The draft row.
    pub draft: Draft,
    /// Seats ordered by seat number.
    pub seats: Vec<DraftSeat>,
    /// Picks ordered by pick number.
    pub picks: Vec<DraftPick>,
}

/// An administrative action recorded for later audit.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuditEntry {
    /// Draft the action applied to.
    pub draft_id: DraftId,
    /// Action name, e.g. `"lock_override"`.
    pub action: String,
    /// Action-specific detail.
    #[schema(value_type = Object)]
    pub detail: serde_json::Value,
    /// When the action was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Durable storage for drafts and their event logs.
#[async_trait]
pub trait DraftStore: Send + Sync + fmt::Debug {
    /// Inserts a new `PENDING` draft.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::InvalidRequest`] if the season already has a
    /// draft, or a persistence error.
    async fn create_draft(&self, new: NewDraft, now: DateTime<Utc>) -> Result<Draft, DraftError>;

    /// Opens a transaction holding the draft's exclusive lock.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::DraftNotFound`] if the draft does not exist.
    async fn begin(&self, draft_id: DraftId) -> Result<Box<dyn DraftTx>, DraftError>;

    /// Loads the draft, seats and picks without taking the draft lock.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::DraftNotFound`] if the draft does not exist.
    async fn load_view(&self, draft_id: DraftId) -> Result<DraftView, DraftError>;

    /// Finds the draft belonging to a season.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on storage failure.
    async fn draft_for_season(&self, season_id: SeasonId) -> Result<Option<DraftId>, DraftError>;

    /// Returns up to `limit` events with `version > after_version`, ascending.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::DraftNotFound`] if the draft does not exist.
    async fn events_since(
        &self,
        draft_id: DraftId,
        after_version: i64,
        limit: i64,
    ) -> Result<Vec<DraftEvent>, DraftError>;

    /// Returns `IN_PROGRESS` drafts whose deadline is at or before `now`,
    /// most overdue first, at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on storage failure.
    async fn overdue_drafts(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<DraftId>, DraftError>;

    /// Reads a participant's autodraft configuration.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on storage failure.
    async fn autodraft_config(
        &self,
        draft_id: DraftId,
        participant_id: ParticipantId,
    ) -> Result<Option<AutodraftConfig>, DraftError>;

    /// Reads all recorded results of a draft.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on storage failure.
    async fn results(&self, draft_id: DraftId) -> Result<Vec<DraftResult>, DraftError>;

    /// Appends an audit record.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on storage failure.
    async fn record_audit(&self, entry: AuditEntry) -> Result<(), DraftError>;
}

/// A unit of work scoped to one draft, holding its exclusive lock.
///
/// The draft row is loaded when the transaction opens and written back on
/// [`DraftTx::commit`]; mutate it through [`DraftTx::draft_mut`].
#[async_trait]
pub trait DraftTx: Send + fmt::Debug {
    /// The locked draft row.
    fn draft(&self) -> &Draft;

    /// Mutable access to the locked draft row.
    fn draft_mut(&mut self) -> &mut Draft;

    /// Loads the draft's ceremony.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on storage failure.
    async fn ceremony(&mut self) -> Result<Ceremony, DraftError>;

    /// Loads the season roster in commissioner-defined order.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on storage failure.
    async fn season_roster(&mut self) -> Result<Vec<ParticipantId>, DraftError>;

    /// Loads seats ordered by seat number.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on storage failure.
    async fn seats(&mut self) -> Result<Vec<DraftSeat>, DraftError>;

    /// Inserts the seats assigned at draft start.
    ///
    /// # Errors
    ///
    /// Fails if the draft already has seats.
    async fn insert_seats(&mut self, seats: &[DraftSeat]) -> Result<(), DraftError>;

    /// Finds the pick stored with an idempotency token.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on storage failure.
    async fn pick_by_token(&mut self, token: &str) -> Result<Option<DraftPick>, DraftError>;

    /// Loads a nomination from the catalog regardless of ceremony.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on storage failure.
    async fn nomination(&mut self, id: NominationId) -> Result<Option<Nomination>, DraftError>;

    /// Counts the nominations of the draft's ceremony.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on storage failure.
    async fn nomination_count(&mut self) -> Result<i32, DraftError>;

    /// Returns `true` if the nomination was already picked in this draft.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on storage failure.
    async fn is_drafted(&mut self, id: NominationId) -> Result<bool, DraftError>;

    /// Lists undrafted nominations of the draft's ceremony, sorted by id.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on storage failure.
    async fn undrafted_nominations(&mut self) -> Result<Vec<NominationId>, DraftError>;

    /// Inserts a pick.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::PickConflict`] if the pick number or token is
    /// already taken, or [`DraftError::NominationTaken`] if the nomination
    /// was already picked.
    async fn insert_pick(&mut self, pick: &DraftPick) -> Result<(), DraftError>;

    /// Inserts an event whose version was assigned by [`append_event`].
    ///
    /// # Errors
    ///
    /// Returns a persistence error on storage failure.
    async fn insert_event(&mut self, event: &DraftEvent) -> Result<(), DraftError>;

    /// Reads a participant's autodraft configuration.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on storage failure.
    async fn autodraft_config(
        &mut self,
        participant_id: ParticipantId,
    ) -> Result<Option<AutodraftConfig>, DraftError>;

    /// Creates or replaces a participant's autodraft configuration.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on storage failure.
    async fn put_autodraft_config(&mut self, config: &AutodraftConfig) -> Result<(), DraftError>;

    /// Loads a ranked plan.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on storage failure.
    async fn plan(&mut self, plan_id: PlanId) -> Result<Option<DraftPlan>, DraftError>;

    /// Creates or replaces a nomination's result.
    ///
    /// # Errors
    ///
    /// Returns a persistence error on storage failure.
    async fn upsert_result(&mut self, result: &DraftResult) -> Result<(), DraftError>;

    /// Persists the draft row and every write, releasing the lock.
    ///
    /// Returns the events appended in this transaction, in version order.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the commit fails; nothing is written.
    async fn commit(self: Box<Self>) -> Result<Vec<DraftEvent>, DraftError>;
}

/// Appends an event, assigning the next version under the draft lock.
///
/// The version counter lives on the locked draft row and is written back in
/// the same commit as the event, so two events can never share a version.
///
/// # Errors
///
/// Returns an error if the version counter overflows or the insert fails.
pub async fn append_event(
    tx: &mut dyn DraftTx,
    event_type: DraftEventType,
    payload: serde_json::Value,
    now: DateTime<Utc>,
) -> Result<DraftEvent, DraftError> {
    let draft = tx.draft_mut();
    draft.version = draft
        .version
        .checked_add(1)
        .ok_or_else(|| DraftError::Internal(format!("version overflow on draft {}", draft.id)))?;
    let event = DraftEvent {
        draft_id: draft.id,
        version: draft.version,
        event_type,
        payload,
        created_at: now,
    };
    tx.insert_event(&event).await?;
    Ok(event)
}
