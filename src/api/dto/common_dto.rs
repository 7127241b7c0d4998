//! Shared DTO types used across multiple endpoints.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{DraftEvent, DraftId};

/// Query parameters for `GET /drafts/{id}/events`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventsQuery {
    /// Return events with a version strictly greater than this. Defaults to 0.
    #[serde(default)]
    pub after_version: i64,
    /// Maximum events to return; capped by the server's page limit.
    #[serde(default)]
    pub limit: Option<i64>,
}

/// A page of the event log.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EventsResponse {
    /// Draft the events belong to.
    pub draft_id: DraftId,
    /// Events in ascending version order.
    pub events: Vec<DraftEvent>,
    /// Version of the last event in this page, or the requested
    /// `after_version` when the page is empty.
    pub last_version: i64,
}

impl EventsResponse {
    /// Builds a page, deriving `last_version`.
    #[must_use]
    pub fn new(draft_id: DraftId, after_version: i64, events: Vec<DraftEvent>) -> Self {
        let last_version = events.last().map_or(after_version, |e| e.version);
        Self {
            draft_id,
            events,
            last_version,
        }
    }
}
