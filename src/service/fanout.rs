//! Per-connection ordered delivery of draft events.
//!
//! The broadcast bus is best-effort: a slow receiver can lag and lose
//! events, and relayed events from other instances may arrive out of order.
//! [`DraftObserver`] turns that stream into a strictly increasing, gap-free
//! sequence per draft by tracking the last delivered version and filling any
//! hole from the event log.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{DraftEvent, DraftId};
use crate::error::DraftError;
use crate::persistence::DraftStore;

/// Tracks what one subscriber has seen of each draft.
#[derive(Debug)]
pub struct DraftObserver {
    store: Arc<dyn DraftStore>,
    last_delivered: HashMap<DraftId, i64>,
    page_limit: i64,
}

impl DraftObserver {
    /// Creates an observer with no subscriptions.
    #[must_use]
    pub fn new(store: Arc<dyn DraftStore>, page_limit: i64) -> Self {
        Self {
            store,
            last_delivered: HashMap::new(),
            page_limit: page_limit.max(1),
        }
    }

    /// Starts following a draft.
    ///
    /// With `since_version` the events after it are returned as the backlog;
    /// without, delivery starts after the draft's current version.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::DraftNotFound`] if the draft does not exist. A
    /// failed subscribe leaves the previous subscription state untouched.
    pub async fn subscribe(
        &mut self,
        draft_id: DraftId,
        since_version: Option<i64>,
    ) -> Result<Vec<DraftEvent>, DraftError> {
        match since_version {
            Some(version) => {
                let previous = self.last_delivered.insert(draft_id, version.max(0));
                let backlog = self.catch_up(draft_id).await;
                if backlog.is_err() {
                    match previous {
                        Some(last) => self.last_delivered.insert(draft_id, last),
                        None => self.last_delivered.remove(&draft_id),
                    };
                }
                backlog
            }
            None => {
                let view = self.store.load_view(draft_id).await?;
                self.last_delivered.insert(draft_id, view.draft.version);
                Ok(Vec::new())
            }
        }
    }

    /// Stops following a draft.
    pub fn unsubscribe(&mut self, draft_id: DraftId) {
        self.last_delivered.remove(&draft_id);
    }

    /// Returns `true` if the draft is followed.
    #[must_use]
    pub fn is_subscribed(&self, draft_id: DraftId) -> bool {
        self.last_delivered.contains_key(&draft_id)
    }

    /// Returns the followed drafts.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<DraftId> {
        self.last_delivered.keys().copied().collect()
    }

    /// Returns the last version delivered for a draft.
    #[must_use]
    pub fn last_version(&self, draft_id: DraftId) -> Option<i64> {
        self.last_delivered.get(&draft_id).copied()
    }

    /// Feeds one bus event and returns what should be delivered, in order.
    ///
    /// Unfollowed drafts and already-delivered versions yield nothing; a
    /// version beyond the next expected one triggers a catch-up from the log.
    ///
    /// # Errors
    ///
    /// Returns the store's error if a catch-up read fails.
    pub async fn accept(&mut self, event: DraftEvent) -> Result<Vec<DraftEvent>, DraftError> {
        let Some(last) = self.last_version(event.draft_id) else {
            return Ok(Vec::new());
        };
        if event.version <= last {
            return Ok(Vec::new());
        }
        if Some(event.version) == last.checked_add(1) {
            self.last_delivered.insert(event.draft_id, event.version);
            return Ok(vec![event]);
        }
        tracing::debug!(
            draft_id = %event.draft_id,
            last,
            received = event.version,
            "event gap; catching up from log"
        );
        self.catch_up(event.draft_id).await
    }

    /// Catches up every followed draft, for use after the bus reported
    /// that this receiver lagged.
    ///
    /// # Errors
    ///
    /// Returns the store's error if a read fails.
    pub async fn resync(&mut self) -> Result<Vec<DraftEvent>, DraftError> {
        let mut delivered = Vec::new();
        for draft_id in self.subscriptions() {
            delivered.extend(self.catch_up(draft_id).await?);
        }
        Ok(delivered)
    }

    async fn catch_up(&mut self, draft_id: DraftId) -> Result<Vec<DraftEvent>, DraftError> {
        let mut delivered = Vec::new();
        loop {
            let after = self.last_version(draft_id).unwrap_or(0);
            let page = self
                .store
                .events_since(draft_id, after, self.page_limit)
                .await?;
            let full_page = i64::try_from(page.len()).unwrap_or(i64::MAX) >= self.page_limit;
            if let Some(last) = page.last() {
                self.last_delivered.insert(draft_id, last.version);
            }
            delivered.extend(page);
            if !full_page {
                return Ok(delivered);
            }
        }
    }
}
