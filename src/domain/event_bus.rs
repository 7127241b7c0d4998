//! Broadcast channel for committed draft events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. Services publish
//! every committed [`DraftEvent`] through an [`EventSink`], and each
//! WebSocket connection subscribes and filters by draft.

use std::fmt;

use tokio::sync::broadcast;

use super::DraftEvent;

/// Destination for committed draft events.
///
/// Passed into services at construction so tests can substitute a
/// recording sink.
pub trait EventSink: Send + Sync + fmt::Debug {
    /// Publishes an already-committed event.
    fn publish(&self, event: DraftEvent);
}

/// Broadcast bus for [`DraftEvent`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity
/// (default 10 000). When the ring buffer is full, the oldest events are
/// dropped for lagging receivers, which then resync from the event log.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DraftEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Sends an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event.
    /// If there are no active receivers, the event is silently dropped.
    pub fn send(&self, event: DraftEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new receiver that will receive all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DraftEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventSink for EventBus {
    fn publish(&self, event: DraftEvent) {
        let _ = self.send(event);
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{DraftEventType, DraftId};
    use chrono::Utc;

    fn make_event(draft_id: DraftId, version: i64) -> DraftEvent {
        DraftEvent {
            draft_id,
            version,
            event_type: DraftEventType::PickMade,
            payload: serde_json::json!({}),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn publish_without_receivers_returns_zero() {
        let bus = EventBus::new(100);
        assert_eq!(bus.send(make_event(DraftId::new(), 1)), 0);
    }

    #[tokio::test]
    async fn subscribers_receive_in_publish_order() {
        let bus = EventBus::new(100);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        let id = DraftId::new();
        bus.publish(make_event(id, 1));
        bus.publish(make_event(id, 2));

        for rx in [&mut rx1, &mut rx2] {
            let Ok(first) = rx.recv().await else {
                panic!("expected first event");
            };
            let Ok(second) = rx.recv().await else {
                panic!("expected second event");
            };
            assert_eq!((first.version, second.version), (1, 2));
        }
    }

    #[test]
    fn receiver_count_tracks_subscribers() {
        let bus = EventBus::new(100);
        assert_eq!(bus.receiver_count(), 0);

        let rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();
        assert_eq!(bus.receiver_count(), 2);

        drop(rx1);
        assert_eq!(bus.receiver_count(), 1);
    }
}
