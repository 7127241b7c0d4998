//! Cross-instance event relay over Postgres `LISTEN/NOTIFY`.
//!
//! Each instance publishes the events it commits to its own bus. The relay
//! picks up notifications from the other instances, loads the referenced
//! event from the log, and publishes it locally so every WebSocket client
//! sees every committed event regardless of which instance wrote it.

use std::sync::Arc;

use serde::Deserialize;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::watch;
use uuid::Uuid;

use super::DraftStore;
use super::postgres::NOTIFY_CHANNEL;
use crate::domain::{DraftId, EventSink};
use crate::error::DraftError;

/// Notification body written by the Postgres store.
#[derive(Debug, Deserialize)]
struct Notice {
    origin: Uuid,
    draft_id: DraftId,
    version: i64,
}

/// Relays events committed by other instances onto the local bus.
#[derive(Debug)]
pub struct NotifyRelay {
    pool: PgPool,
    instance_id: Uuid,
    store: Arc<dyn DraftStore>,
    sink: Arc<dyn EventSink>,
}

impl NotifyRelay {
    /// Creates a relay for this instance.
    #[must_use]
    pub fn new(
        pool: PgPool,
        instance_id: Uuid,
        store: Arc<dyn DraftStore>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            pool,
            instance_id,
            store,
            sink,
        }
    }

    /// Listens until `shutdown` flips to `true`.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the listener cannot connect or the
    /// connection is lost.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), DraftError> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(NOTIFY_CHANNEL).await?;
        tracing::info!(channel = NOTIFY_CHANNEL, "notify relay listening");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                notification = listener.recv() => {
                    let notification = notification?;
                    self.relay(notification.payload()).await;
                }
            }
        }

        tracing::info!("notify relay stopped");
        Ok(())
    }

    async fn relay(&self, payload: &str) {
        let notice: Notice = match serde_json::from_str(payload) {
            Ok(notice) => notice,
            Err(e) => {
                tracing::warn!(error = %e, payload, "malformed draft notification");
                return;
            }
        };
        if notice.origin == self.instance_id {
            return;
        }
        let after = notice.version.saturating_sub(1);
        match self.store.events_since(notice.draft_id, after, 1).await {
            Ok(events) => {
                for event in events {
                    self.sink.publish(event);
                }
            }
            Err(e) => {
                tracing::warn!(
                    draft_id = %notice.draft_id,
                    version = notice.version,
                    error = %e,
                    "failed to load relayed event"
                );
            }
        }
    }
}
