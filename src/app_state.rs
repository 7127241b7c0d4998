//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::{Clock, EventBus, EventSink};
use crate::persistence::DraftStore;
use crate::service::{DraftService, PickService, TimerService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Draft lifecycle service.
    pub draft_service: Arc<DraftService>,
    /// Pick submission service.
    pub pick_service: Arc<PickService>,
    /// Deadline tick service.
    pub timer_service: Arc<TimerService>,
    /// Backing store, used by WebSocket observers for catch-up reads.
    pub store: Arc<dyn DraftStore>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
    /// Maximum events per event-log page.
    pub events_page_limit: i64,
}

impl AppState {
    /// Wires the services around a store, bus and clock.
    #[must_use]
    pub fn new(
        store: Arc<dyn DraftStore>,
        event_bus: EventBus,
        clock: Arc<dyn Clock>,
        events_page_limit: i64,
    ) -> Self {
        let sink: Arc<dyn EventSink> = Arc::new(event_bus.clone());
        Self {
            draft_service: Arc::new(DraftService::new(
                Arc::clone(&store),
                Arc::clone(&sink),
                Arc::clone(&clock),
                events_page_limit,
            )),
            pick_service: Arc::new(PickService::new(
                Arc::clone(&store),
                Arc::clone(&sink),
                Arc::clone(&clock),
            )),
            timer_service: Arc::new(TimerService::new(Arc::clone(&store), sink, clock)),
            store,
            event_bus,
            events_page_limit: events_page_limit.max(1),
        }
    }
}
