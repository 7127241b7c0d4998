//! WebSocket connection loop.
//!
//! Handles the read/write loop for a single WebSocket connection: commands
//! from the client update the connection's [`DraftObserver`], and events
//! from the bus pass through it so the client sees every followed draft's
//! events exactly once, in version order.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use crate::domain::DraftEvent;
use crate::persistence::DraftStore;
use crate::service::DraftObserver;

/// Runs the read/write loop for a single WebSocket connection.
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<DraftEvent>,
    store: Arc<dyn DraftStore>,
    page_limit: i64,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut observer = DraftObserver::new(store, page_limit);

    loop {
        let outgoing = tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => handle_text_message(&text, &mut observer).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => Vec::new(),
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(event) => match observer.accept(event).await {
                        Ok(events) => events.iter().filter_map(event_message).collect(),
                        Err(e) => vec![WsMessage::error(String::new(), e.error_code(), &e.to_string()).to_text()],
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus; resyncing");
                        match observer.resync().await {
                            Ok(events) => events.iter().filter_map(event_message).collect(),
                            Err(e) => vec![WsMessage::error(String::new(), e.error_code(), &e.to_string()).to_text()],
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };

        for text in outgoing {
            if ws_tx.send(Message::text(text)).await.is_err() {
                tracing::debug!("ws send failed; closing");
                return;
            }
        }
    }

    tracing::debug!("ws connection closed");
}

/// Wraps an event in an `event` frame. Events that fail to serialize are
/// logged and skipped.
fn event_message(event: &DraftEvent) -> Option<String> {
    match serde_json::to_value(event) {
        Ok(payload) => Some(
            WsMessage::new(uuid::Uuid::new_v4().to_string(), WsMessageType::Event, payload)
                .to_text(),
        ),
        Err(e) => {
            tracing::warn!(
                draft_id = %event.draft_id,
                version = event.version,
                error = %e,
                "failed to serialize draft event; skipping"
            );
            None
        }
    }
}

/// Handles a text message from the client, returning the messages to send
/// back: a response or error, followed by any replayed backlog.
async fn handle_text_message(text: &str, observer: &mut DraftObserver) -> Vec<String> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return vec![WsMessage::error(String::new(), 400, "malformed JSON").to_text()];
    };
    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload) else {
        return vec![WsMessage::error(msg.id, 400, "unknown command").to_text()];
    };

    match command {
        WsCommand::Subscribe {
            draft_ids,
            since_version,
        } => {
            // A failing draft rolls back the drafts this command added.
            let added: Vec<_> = draft_ids
                .iter()
                .copied()
                .filter(|draft_id| !observer.is_subscribed(*draft_id))
                .collect();
            let mut backlog = Vec::new();
            let mut subscribed = Vec::new();
            for draft_id in draft_ids {
                match observer.subscribe(draft_id, since_version).await {
                    Ok(events) => {
                        subscribed.push(serde_json::json!({
                            "draft_id": draft_id,
                            "version": observer.last_version(draft_id),
                        }));
                        backlog.extend(events);
                    }
                    Err(e) => {
                        for draft_id in &added {
                            observer.unsubscribe(*draft_id);
                        }
                        tracing::debug!(%draft_id, error = %e, "ws subscribe rejected");
                        return vec![
                            WsMessage::error(msg.id, e.error_code(), &e.to_string()).to_text(),
                        ];
                    }
                }
            }
            let response = WsMessage::new(
                msg.id,
                WsMessageType::Response,
                serde_json::json!({
                    "subscribed": subscribed,
                    "count": observer.subscriptions().len(),
                    "backlog": backlog.len(),
                }),
            );
            std::iter::once(response.to_text())
                .chain(backlog.iter().filter_map(event_message))
                .collect()
        }
        WsCommand::Unsubscribe { draft_ids } => {
            for draft_id in &draft_ids {
                observer.unsubscribe(*draft_id);
            }
            let response = WsMessage::new(
                msg.id,
                WsMessageType::Response,
                serde_json::json!({
                    "unsubscribed": draft_ids,
                    "remaining_count": observer.subscriptions().len(),
                }),
            );
            vec![response.to_text()]
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::{CeremonyId, DraftId, DraftOrderType, RemainderStrategy, SeasonId};
    use crate::persistence::{MemoryDraftStore, NewDraft};

    async fn observer_with_draft() -> (DraftObserver, DraftId) {
        let store = Arc::new(MemoryDraftStore::new());
        let Ok(draft) = store
            .create_draft(
                NewDraft {
                    season_id: SeasonId::new(),
                    ceremony_id: CeremonyId::new(),
                    order_type: DraftOrderType::Snake,
                    picks_per_seat: 1,
                    total_picks_override: None,
                    remainder_strategy: RemainderStrategy::Undrafted,
                    pick_timer_seconds: None,
                    auto_pick_seed: None,
                },
                Utc::now(),
            )
            .await
        else {
            panic!("create_draft failed");
        };
        (DraftObserver::new(store, 100), draft.id)
    }

    fn command(payload: serde_json::Value) -> String {
        WsMessage::new("req-1".to_string(), WsMessageType::Command, payload).to_text()
    }

    fn single_reply(replies: &[String]) -> WsMessage {
        let [reply] = replies else {
            panic!("expected one reply, got {}", replies.len());
        };
        let Ok(message) = serde_json::from_str::<WsMessage>(reply) else {
            panic!("reply is not a ws message");
        };
        message
    }

    #[tokio::test]
    async fn unknown_command_is_a_bad_request() {
        let (mut observer, _) = observer_with_draft().await;
        let replies = handle_text_message(
            &command(serde_json::json!({ "command": "pause" })),
            &mut observer,
        )
        .await;

        let reply = single_reply(&replies);
        assert_eq!(reply.msg_type, WsMessageType::Error);
        assert_eq!(reply.id, "req-1");
        assert_eq!(reply.payload.get("code"), Some(&serde_json::json!(400)));
    }

    #[tokio::test]
    async fn failed_subscribe_leaves_no_partial_subscriptions() {
        let (mut observer, draft_id) = observer_with_draft().await;
        let missing = DraftId::new();
        let replies = handle_text_message(
            &command(serde_json::json!({
                "command": "subscribe",
                "draft_ids": [draft_id, missing],
                "since_version": 0,
            })),
            &mut observer,
        )
        .await;

        let reply = single_reply(&replies);
        assert_eq!(reply.msg_type, WsMessageType::Error);
        assert_eq!(reply.payload.get("code"), Some(&serde_json::json!(4001)));
        assert!(observer.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn failed_subscribe_keeps_earlier_subscriptions() {
        let (mut observer, draft_id) = observer_with_draft().await;
        let Ok(_) = observer.subscribe(draft_id, None).await else {
            panic!("subscribe failed");
        };

        let replies = handle_text_message(
            &command(serde_json::json!({
                "command": "subscribe",
                "draft_ids": [draft_id, DraftId::new()],
            })),
            &mut observer,
        )
        .await;

        assert_eq!(single_reply(&replies).msg_type, WsMessageType::Error);
        assert_eq!(observer.subscriptions(), vec![draft_id]);
    }

    #[tokio::test]
    async fn subscribe_answers_with_the_current_version() {
        let (mut observer, draft_id) = observer_with_draft().await;
        let replies = handle_text_message(
            &command(serde_json::json!({
                "command": "subscribe",
                "draft_ids": [draft_id],
            })),
            &mut observer,
        )
        .await;

        let reply = single_reply(&replies);
        assert_eq!(reply.msg_type, WsMessageType::Response);
        assert_eq!(reply.payload.get("count"), Some(&serde_json::json!(1)));
        assert_eq!(reply.payload.get("backlog"), Some(&serde_json::json!(0)));
        assert!(observer.is_subscribed(draft_id));
    }
}
