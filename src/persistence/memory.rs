//! In-memory draft store with per-draft fine-grained locking.
//!
//! [`MemoryDraftStore`] keeps every draft's tables behind its own
//! [`tokio::sync::Mutex`]. A transaction takes that mutex for its whole
//! lifetime and works on a private copy of the tables; commit swaps the
//! copy in, drop discards it.
//!
//! # Concurrency
//!
//! - Transactions on the same draft are serialized.
//! - Transactions on different drafts run concurrently.
//! - The catalog (ceremonies, nominations, rosters, plans) is read-mostly
//!   and shared behind a [`RwLock`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::{AuditEntry, DraftStore, DraftTx, DraftView, NewDraft};
use crate::domain::{
    AutodraftConfig, Ceremony, CeremonyId, Draft, DraftEvent, DraftId, DraftPick, DraftPlan,
    DraftResult, DraftSeat, DraftStatus, Nomination, NominationId, ParticipantId, PlanId,
    SeasonId,
};
use crate::error::DraftError;

#[derive(Debug, Clone)]
struct DraftTables {
    draft: Draft,
    seats: Vec<DraftSeat>,
    picks: Vec<DraftPick>,
    events: Vec<DraftEvent>,
    autodraft: HashMap<ParticipantId, AutodraftConfig>,
    results: BTreeMap<NominationId, DraftResult>,
}

#[derive(Debug, Default)]
struct Catalog {
    ceremonies: HashMap<CeremonyId, Ceremony>,
    nominations: HashMap<NominationId, Nomination>,
    rosters: HashMap<SeasonId, Vec<ParticipantId>>,
    plans: HashMap<PlanId, DraftPlan>,
}

impl Catalog {
    fn ceremony_nominations(&self, ceremony_id: CeremonyId) -> Vec<NominationId> {
        let mut ids: Vec<NominationId> = self
            .nominations
            .values()
            .filter(|n| n.ceremony_id == ceremony_id)
            .map(|n| n.id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

/// Draft store kept entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryDraftStore {
    drafts: RwLock<HashMap<DraftId, Arc<Mutex<DraftTables>>>>,
    catalog: Arc<RwLock<Catalog>>,
    audit: Mutex<Vec<AuditEntry>>,
}

impl MemoryDraftStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a ceremony.
    pub async fn insert_ceremony(&self, ceremony: Ceremony) {
        self.catalog
            .write()
            .await
            .ceremonies
            .insert(ceremony.id, ceremony);
    }

    /// Adds nominations to the catalog.
    pub async fn insert_nominations(&self, nominations: impl IntoIterator<Item = Nomination>) {
        let mut catalog = self.catalog.write().await;
        for nomination in nominations {
            catalog.nominations.insert(nomination.id, nomination);
        }
    }

    /// Sets a season's roster in commissioner-defined draft order.
    pub async fn set_roster(&self, season_id: SeasonId, participants: Vec<ParticipantId>) {
        self.catalog
            .write()
            .await
            .rosters
            .insert(season_id, participants);
    }

    /// Registers or replaces a ranked plan.
    pub async fn insert_plan(&self, plan: DraftPlan) {
        self.catalog.write().await.plans.insert(plan.id, plan);
    }

    /// Returns every audit record written so far.
    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.lock().await.clone()
    }

    async fn tables(&self, draft_id: DraftId) -> Result<Arc<Mutex<DraftTables>>, DraftError> {
        let map = self.drafts.read().await;
        map.get(&draft_id)
            .cloned()
            .ok_or(DraftError::DraftNotFound(draft_id))
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn create_draft(&self, new: NewDraft, now: DateTime<Utc>) -> Result<Draft, DraftError> {
        {
            let mut catalog = self.catalog.write().await;
            catalog
                .ceremonies
                .entry(new.ceremony_id)
                .or_insert_with(|| Ceremony {
                    id: new.ceremony_id,
                    draft_locked_at: None,
                });
        }

        let mut map = self.drafts.write().await;
        for tables in map.values() {
            if tables.lock().await.draft.season_id == new.season_id {
                return Err(DraftError::InvalidRequest(format!(
                    "season {} already has a draft",
                    new.season_id
                )));
            }
        }

        let draft = Draft {
            id: DraftId::new(),
            season_id: new.season_id,
            ceremony_id: new.ceremony_id,
            status: DraftStatus::Pending,
            order_type: new.order_type,
            seat_count: 0,
            picks_per_seat: new.picks_per_seat,
            total_picks_override: new.total_picks_override,
            remainder_strategy: new.remainder_strategy,
            total_required_picks: None,
            current_pick_number: None,
            pick_timer_seconds: new.pick_timer_seconds,
            pick_deadline_at: None,
            timer_remaining_ms: None,
            auto_pick_seed: new.auto_pick_seed,
            allow_drafting_after_lock: false,
            lock_override_at: None,
            version: 0,
            created_at: now,
            started_at: None,
            completed_at: None,
        };
        let tables = DraftTables {
            draft: draft.clone(),
            seats: Vec::new(),
            picks: Vec::new(),
            events: Vec::new(),
            autodraft: HashMap::new(),
            results: BTreeMap::new(),
        };
        map.insert(draft.id, Arc::new(Mutex::new(tables)));
        Ok(draft)
    }

    async fn begin(&self, draft_id: DraftId) -> Result<Box<dyn DraftTx>, DraftError> {
        let guard = self.tables(draft_id).await?.lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryDraftTx {
            guard,
            work,
            catalog: Arc::clone(&self.catalog),
            appended: Vec::new(),
        }))
    }

    async fn load_view(&self, draft_id: DraftId) -> Result<DraftView, DraftError> {
        let tables = self.tables(draft_id).await?;
        let tables = tables.lock().await;
        Ok(DraftView {
            draft: tables.draft.clone(),
            seats: tables.seats.clone(),
            picks: tables.picks.clone(),
        })
    }

    async fn draft_for_season(&self, season_id: SeasonId) -> Result<Option<DraftId>, DraftError> {
        let map = self.drafts.read().await;
        for (id, tables) in map.iter() {
            if tables.lock().await.draft.season_id == season_id {
                return Ok(Some(*id));
            }
        }
        Ok(None)
    }

    async fn events_since(
        &self,
        draft_id: DraftId,
        after_version: i64,
        limit: i64,
    ) -> Result<Vec<DraftEvent>, DraftError> {
        let tables = self.tables(draft_id).await?;
        let tables = tables.lock().await;
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(tables
            .events
            .iter()
            .filter(|event| event.version > after_version)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn overdue_drafts(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<DraftId>, DraftError> {
        let map = self.drafts.read().await;
        let mut overdue = Vec::new();
        for tables in map.values() {
            let guard = tables.lock().await;
            let draft = &guard.draft;
            if draft.status != DraftStatus::InProgress {
                continue;
            }
            if let Some(deadline) = draft.pick_deadline_at
                && deadline <= now
            {
                overdue.push((deadline, draft.id));
            }
        }
        overdue.sort_unstable();
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(overdue.into_iter().take(limit).map(|(_, id)| id).collect())
    }

    async fn autodraft_config(
        &self,
        draft_id: DraftId,
        participant_id: ParticipantId,
    ) -> Result<Option<AutodraftConfig>, DraftError> {
        let tables = self.tables(draft_id).await?;
        let tables = tables.lock().await;
        Ok(tables.autodraft.get(&participant_id).cloned())
    }

    async fn results(&self, draft_id: DraftId) -> Result<Vec<DraftResult>, DraftError> {
        let tables = self.tables(draft_id).await?;
        let tables = tables.lock().await;
        Ok(tables.results.values().cloned().collect())
    }

    async fn record_audit(&self, entry: AuditEntry) -> Result<(), DraftError> {
        self.audit.lock().await.push(entry);
        Ok(())
    }
}

#[derive(Debug)]
struct MemoryDraftTx {
    guard: OwnedMutexGuard<DraftTables>,
    work: DraftTables,
    catalog: Arc<RwLock<Catalog>>,
    appended: Vec<DraftEvent>,
}

impl MemoryDraftTx {
    fn drafted(&self) -> HashSet<NominationId> {
        self.work.picks.iter().map(|p| p.nomination_id).collect()
    }
}

#[async_trait]
impl DraftTx for MemoryDraftTx {
    fn draft(&self) -> &Draft {
        &self.work.draft
    }

    fn draft_mut(&mut self) -> &mut Draft {
        &mut self.work.draft
    }

    async fn ceremony(&mut self) -> Result<Ceremony, DraftError> {
        let ceremony_id = self.work.draft.ceremony_id;
        self.catalog
            .read()
            .await
            .ceremonies
            .get(&ceremony_id)
            .cloned()
            .ok_or_else(|| DraftError::Internal(format!("ceremony {ceremony_id} missing")))
    }

    async fn season_roster(&mut self) -> Result<Vec<ParticipantId>, DraftError> {
        let season_id = self.work.draft.season_id;
        Ok(self
            .catalog
            .read()
            .await
            .rosters
            .get(&season_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn seats(&mut self) -> Result<Vec<DraftSeat>, DraftError> {
        Ok(self.work.seats.clone())
    }

    async fn insert_seats(&mut self, seats: &[DraftSeat]) -> Result<(), DraftError> {
        if !self.work.seats.is_empty() {
            return Err(DraftError::InvalidRequest(format!(
                "draft {} already has seats",
                self.work.draft.id
            )));
        }
        let mut seats = seats.to_vec();
        seats.sort_by_key(|s| s.seat_number);
        self.work.seats = seats;
        Ok(())
    }

    async fn pick_by_token(&mut self, token: &str) -> Result<Option<DraftPick>, DraftError> {
        Ok(self
            .work
            .picks
            .iter()
            .find(|p| p.idempotency_token.as_deref() == Some(token))
            .cloned())
    }

    async fn nomination(&mut self, id: NominationId) -> Result<Option<Nomination>, DraftError> {
        Ok(self.catalog.read().await.nominations.get(&id).cloned())
    }

    async fn nomination_count(&mut self) -> Result<i32, DraftError> {
        let count = self
            .catalog
            .read()
            .await
            .ceremony_nominations(self.work.draft.ceremony_id)
            .len();
        Ok(i32::try_from(count).unwrap_or(i32::MAX))
    }

    async fn is_drafted(&mut self, id: NominationId) -> Result<bool, DraftError> {
        Ok(self.work.picks.iter().any(|p| p.nomination_id == id))
    }

    async fn undrafted_nominations(&mut self) -> Result<Vec<NominationId>, DraftError> {
        let drafted = self.drafted();
        let all = self
            .catalog
            .read()
            .await
            .ceremony_nominations(self.work.draft.ceremony_id);
        Ok(all.into_iter().filter(|id| !drafted.contains(id)).collect())
    }

    async fn insert_pick(&mut self, pick: &DraftPick) -> Result<(), DraftError> {
        let draft_id = self.work.draft.id;
        for existing in &self.work.picks {
            if existing.pick_number == pick.pick_number
                || (pick.idempotency_token.is_some()
                    && existing.idempotency_token == pick.idempotency_token)
            {
                return Err(DraftError::PickConflict {
                    draft_id,
                    pick_number: pick.pick_number,
                });
            }
            if existing.nomination_id == pick.nomination_id {
                return Err(DraftError::NominationTaken(pick.nomination_id));
            }
        }
        self.work.picks.push(pick.clone());
        Ok(())
    }

    async fn insert_event(&mut self, event: &DraftEvent) -> Result<(), DraftError> {
        if self.work.events.iter().any(|e| e.version == event.version) {
            return Err(DraftError::Internal(format!(
                "duplicate event version {} for draft {}",
                event.version, event.draft_id
            )));
        }
        self.work.events.push(event.clone());
        self.appended.push(event.clone());
        Ok(())
    }

    async fn autodraft_config(
        &mut self,
        participant_id: ParticipantId,
    ) -> Result<Option<AutodraftConfig>, DraftError> {
        Ok(self.work.autodraft.get(&participant_id).cloned())
    }

    async fn put_autodraft_config(&mut self, config: &AutodraftConfig) -> Result<(), DraftError> {
        self.work
            .autodraft
            .insert(config.participant_id, config.clone());
        Ok(())
    }

    async fn plan(&mut self, plan_id: PlanId) -> Result<Option<DraftPlan>, DraftError> {
        Ok(self.catalog.read().await.plans.get(&plan_id).cloned())
    }

    async fn upsert_result(&mut self, result: &DraftResult) -> Result<(), DraftError> {
        self.work
            .results
            .insert(result.nomination_id, result.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<Vec<DraftEvent>, DraftError> {
        let Self {
            mut guard,
            work,
            appended,
            ..
        } = *self;
        *guard = work;
        Ok(appended)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{DraftEventType, DraftOrderType, RemainderStrategy};
    use crate::persistence::append_event;

    fn new_draft() -> NewDraft {
        NewDraft {
            season_id: SeasonId::new(),
            ceremony_id: CeremonyId::new(),
            order_type: DraftOrderType::Snake,
            picks_per_seat: 2,
            total_picks_override: None,
            remainder_strategy: RemainderStrategy::Undrafted,
            pick_timer_seconds: None,
            auto_pick_seed: None,
        }
    }

    #[tokio::test]
    async fn begin_unknown_draft_is_not_found() {
        let store = MemoryDraftStore::new();
        let result = store.begin(DraftId::new()).await;
        assert!(matches!(result, Err(DraftError::DraftNotFound(_))));
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let store = MemoryDraftStore::new();
        let Ok(draft) = store.create_draft(new_draft(), Utc::now()).await else {
            panic!("create failed");
        };

        let Ok(mut tx) = store.begin(draft.id).await else {
            panic!("begin failed");
        };
        let Ok(_) = append_event(
            tx.as_mut(),
            DraftEventType::DraftStarted,
            serde_json::json!({}),
            Utc::now(),
        )
        .await
        else {
            panic!("append failed");
        };
        drop(tx);

        let Ok(view) = store.load_view(draft.id).await else {
            panic!("load failed");
        };
        assert_eq!(view.draft.version, 0);
        let Ok(events) = store.events_since(draft.id, 0, 100).await else {
            panic!("events failed");
        };
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn committed_events_are_versioned_and_queryable() {
        let store = MemoryDraftStore::new();
        let Ok(draft) = store.create_draft(new_draft(), Utc::now()).await else {
            panic!("create failed");
        };

        for _ in 0..3 {
            let Ok(mut tx) = store.begin(draft.id).await else {
                panic!("begin failed");
            };
            let Ok(_) = append_event(
                tx.as_mut(),
                DraftEventType::PickMade,
                serde_json::json!({}),
                Utc::now(),
            )
            .await
            else {
                panic!("append failed");
            };
            let Ok(_) = tx.commit().await else {
                panic!("commit failed");
            };
        }

        let Ok(events) = store.events_since(draft.id, 1, 100).await else {
            panic!("events failed");
        };
        let versions: Vec<i64> = events.iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![2, 3]);
    }

    #[tokio::test]
    async fn one_draft_per_season() {
        let store = MemoryDraftStore::new();
        let new = new_draft();
        let Ok(_) = store.create_draft(new.clone(), Utc::now()).await else {
            panic!("create failed");
        };
        let second = store.create_draft(new, Utc::now()).await;
        assert!(matches!(second, Err(DraftError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn duplicate_pick_number_conflicts() {
        let store = MemoryDraftStore::new();
        let Ok(draft) = store.create_draft(new_draft(), Utc::now()).await else {
            panic!("create failed");
        };
        let Ok(mut tx) = store.begin(draft.id).await else {
            panic!("begin failed");
        };
        let pick = DraftPick {
            draft_id: draft.id,
            pick_number: 1,
            round_number: 1,
            seat_number: 1,
            participant_id: ParticipantId::new(),
            nomination_id: NominationId::new(),
            made_at: Utc::now(),
            idempotency_token: None,
        };
        let Ok(()) = tx.insert_pick(&pick).await else {
            panic!("first insert failed");
        };
        let mut racer = pick.clone();
        racer.nomination_id = NominationId::new();
        let result = tx.insert_pick(&racer).await;
        assert!(matches!(
            result,
            Err(DraftError::PickConflict { pick_number: 1, .. })
        ));
    }
}
