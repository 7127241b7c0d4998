//! Shared fixture: an in-memory engine on a manual clock.

#![allow(dead_code, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use draft_gateway::domain::{
    Ceremony, CeremonyId, Clock, DraftEvent, DraftId, DraftOrderType, EventBus, EventSink,
    ManualClock, Nomination, NominationId, ParticipantId, RemainderStrategy, SeasonId,
};
use draft_gateway::persistence::{
    ClusterMutex, DraftStore, MemoryClusterMutex, MemoryDraftStore, NewDraft,
};
use draft_gateway::service::{
    DeadlineSweeper, DraftService, DraftSnapshot, PickRequest, PickService, SweeperSettings,
    TimerService,
};

pub const PICK_TIMER_SECONDS: i32 = 30;

#[derive(Debug)]
pub struct Harness {
    pub store: Arc<MemoryDraftStore>,
    pub clock: ManualClock,
    pub bus: EventBus,
    pub drafts: DraftService,
    pub picks: PickService,
    pub timer: TimerService,
    pub participants: Vec<ParticipantId>,
    /// Pool of the ceremony, sorted by id.
    pub nominations: Vec<NominationId>,
    pub ceremony_id: CeremonyId,
    pub season_id: SeasonId,
    pub draft_id: DraftId,
}

/// Another draft created in the same store, with its own season and pool.
#[derive(Debug, Clone)]
pub struct SideDraft {
    pub draft_id: DraftId,
    pub participants: Vec<ParticipantId>,
    pub nominations: Vec<NominationId>,
}

impl SideDraft {
    pub fn participant(&self, index: usize) -> ParticipantId {
        let Some(participant) = self.participants.get(index) else {
            panic!("no participant {index}");
        };
        *participant
    }
}

fn snake_draft(
    season_id: SeasonId,
    ceremony_id: CeremonyId,
    picks_per_seat: i32,
) -> NewDraft {
    NewDraft {
        season_id,
        ceremony_id,
        order_type: DraftOrderType::Snake,
        picks_per_seat,
        total_picks_override: None,
        remainder_strategy: RemainderStrategy::Undrafted,
        pick_timer_seconds: Some(PICK_TIMER_SECONDS),
        auto_pick_seed: Some(42),
    }
}

async fn seed_catalog(
    store: &MemoryDraftStore,
    season_id: SeasonId,
    ceremony_id: CeremonyId,
    seats: usize,
    pool: usize,
) -> (Vec<ParticipantId>, Vec<NominationId>) {
    let participants: Vec<ParticipantId> = (0..seats).map(|_| ParticipantId::new()).collect();
    store.set_roster(season_id, participants.clone()).await;

    let mut nominations: Vec<Nomination> = (0..pool)
        .map(|i| Nomination {
            id: NominationId::new(),
            ceremony_id,
            category: "Best Picture".to_string(),
            label: format!("Nominee {i}"),
        })
        .collect();
    nominations.sort_by_key(|n| n.id);
    let nomination_ids = nominations.iter().map(|n| n.id).collect();
    store.insert_nominations(nominations).await;
    (participants, nomination_ids)
}

impl Harness {
    /// Builds a pending snake draft with `seats` participants on the roster
    /// and a pool of `pool` nominations.
    pub async fn new(seats: usize, picks_per_seat: i32, pool: usize) -> Self {
        let store = Arc::new(MemoryDraftStore::new());
        let dyn_store: Arc<dyn DraftStore> = Arc::clone(&store) as Arc<dyn DraftStore>;
        let clock = ManualClock::new(Utc::now());
        let dyn_clock: Arc<dyn Clock> = Arc::new(clock.clone());
        let bus = EventBus::new(1024);
        let sink: Arc<dyn EventSink> = Arc::new(bus.clone());

        let season_id = SeasonId::new();
        let ceremony_id = CeremonyId::new();
        let (participants, nomination_ids) =
            seed_catalog(&store, season_id, ceremony_id, seats, pool).await;

        let drafts = DraftService::new(
            Arc::clone(&dyn_store),
            Arc::clone(&sink),
            Arc::clone(&dyn_clock),
            100,
        );
        let Ok(draft) = drafts
            .create_draft(snake_draft(season_id, ceremony_id, picks_per_seat))
            .await
        else {
            panic!("create_draft failed");
        };

        Self {
            picks: PickService::new(
                Arc::clone(&dyn_store),
                Arc::clone(&sink),
                Arc::clone(&dyn_clock),
            ),
            timer: TimerService::new(dyn_store, sink, dyn_clock),
            store,
            clock,
            bus,
            drafts,
            participants,
            nominations: nomination_ids,
            ceremony_id,
            season_id,
            draft_id: draft.id,
        }
    }

    pub fn participant(&self, index: usize) -> ParticipantId {
        let Some(participant) = self.participants.get(index) else {
            panic!("no participant {index}");
        };
        *participant
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Creates a second pending draft in the same store. `locked_at` sets the
    /// draft lock of its ceremony.
    pub async fn add_draft(
        &self,
        seats: usize,
        picks_per_seat: i32,
        pool: usize,
        locked_at: Option<DateTime<Utc>>,
    ) -> SideDraft {
        let season_id = SeasonId::new();
        let ceremony_id = CeremonyId::new();
        self.store
            .insert_ceremony(Ceremony {
                id: ceremony_id,
                draft_locked_at: locked_at,
            })
            .await;
        let (participants, nominations) =
            seed_catalog(&self.store, season_id, ceremony_id, seats, pool).await;
        let Ok(draft) = self
            .drafts
            .create_draft(snake_draft(season_id, ceremony_id, picks_per_seat))
            .await
        else {
            panic!("create_draft failed");
        };
        SideDraft {
            draft_id: draft.id,
            participants,
            nominations,
        }
    }

    pub fn nomination(&self, index: usize) -> NominationId {
        let Some(nomination) = self.nominations.get(index) else {
            panic!("no nomination {index}");
        };
        *nomination
    }

    pub async fn start(&self) {
        let Ok(_) = self.drafts.start_draft(self.draft_id).await else {
            panic!("start_draft failed");
        };
    }

    pub async fn snapshot(&self) -> DraftSnapshot {
        let Ok(snapshot) = self.drafts.snapshot(self.draft_id).await else {
            panic!("snapshot failed");
        };
        snapshot
    }

    /// Participant holding the seat on the clock.
    pub async fn on_the_clock(&self) -> ParticipantId {
        let Some(turn) = self.snapshot().await.turn else {
            panic!("no turn on the clock");
        };
        turn.participant_id
    }

    pub fn request(&self, participant_id: ParticipantId, nomination: usize) -> PickRequest {
        PickRequest {
            participant_id,
            nomination_id: self.nomination(nomination),
            idempotency_token: None,
            expected_pick_number: None,
        }
    }

    pub async fn events(&self) -> Vec<DraftEvent> {
        let Ok(events) = self.store.events_since(self.draft_id, 0, 1_000).await else {
            panic!("events_since failed");
        };
        events
    }

    pub fn sweeper(&self, mutex: Arc<dyn ClusterMutex>) -> DeadlineSweeper {
        self.sweeper_with_batch(mutex, 10)
    }

    pub fn sweeper_with_batch(
        &self,
        mutex: Arc<dyn ClusterMutex>,
        batch_size: i64,
    ) -> DeadlineSweeper {
        DeadlineSweeper::new(
            Arc::clone(&self.store) as Arc<dyn DraftStore>,
            mutex,
            self.timer.clone(),
            Arc::new(self.clock.clone()),
            SweeperSettings {
                interval: Duration::from_millis(10),
                batch_size,
                lock_name: "draft-deadline-sweeper".to_string(),
            },
        )
    }

    pub fn memory_sweeper(&self) -> DeadlineSweeper {
        self.sweeper(Arc::new(MemoryClusterMutex::new()))
    }
}
