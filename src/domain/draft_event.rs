//! Append-only draft event log entries.
//!
//! Every state change appends a [`DraftEvent`] whose `version` is one more
//! than the previous event of the same draft. The log is the single source
//! of truth for realtime replay: observers that reconnect ask for the events
//! after the last version they saw.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::DraftId;
use crate::error::DraftError;

/// Discriminator for [`DraftEvent`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum DraftEventType {
    /// Seats assigned and the first pick put on the clock.
    #[serde(rename = "draft.started")]
    DraftStarted,
    /// Draft paused; the timer is frozen.
    #[serde(rename = "draft.paused")]
    DraftPaused,
    /// Draft resumed with the frozen timer budget.
    #[serde(rename = "draft.resumed")]
    DraftResumed,
    /// Final pick made.
    #[serde(rename = "draft.completed")]
    DraftCompleted,
    /// Draft cancelled directly.
    #[serde(rename = "draft.cancelled")]
    DraftCancelled,
    /// A pick was made, by a participant or by autodraft.
    #[serde(rename = "draft.pick.made")]
    PickMade,
    /// The seat on the clock ran out of time without autodraft.
    #[serde(rename = "draft.pick.expired")]
    PickExpired,
    /// Picks allowed past the ceremony lock.
    #[serde(rename = "draft.lock.overridden")]
    LockOverridden,
    /// The owning season was cancelled, cancelling the draft.
    #[serde(rename = "season.cancelled")]
    SeasonCancelled,
}

impl DraftEventType {
    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DraftStarted => "draft.started",
            Self::DraftPaused => "draft.paused",
            Self::DraftResumed => "draft.resumed",
            Self::DraftCompleted => "draft.completed",
            Self::DraftCancelled => "draft.cancelled",
            Self::PickMade => "draft.pick.made",
            Self::PickExpired => "draft.pick.expired",
            Self::LockOverridden => "draft.lock.overridden",
            Self::SeasonCancelled => "season.cancelled",
        }
    }
}

impl fmt::Display for DraftEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DraftEventType {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s {
            "draft.started" => Self::DraftStarted,
            "draft.paused" => Self::DraftPaused,
            "draft.resumed" => Self::DraftResumed,
            "draft.completed" => Self::DraftCompleted,
            "draft.cancelled" => Self::DraftCancelled,
            "draft.pick.made" => Self::PickMade,
            "draft.pick.expired" => Self::PickExpired,
            "draft.lock.overridden" => Self::LockOverridden,
            "season.cancelled" => Self::SeasonCancelled,
            other => {
                return Err(DraftError::PersistenceError(format!(
                    "unknown event type in log: {other}"
                )));
            }
        };
        Ok(parsed)
    }
}

/// A versioned entry in a draft's event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DraftEvent {
    /// Draft the event belongs to.
    pub draft_id: DraftId,
    /// Strictly increasing, gap-free per draft, starting at 1.
    pub version: i64,
    /// Event discriminator.
    pub event_type: DraftEventType,
    /// Event-specific payload.
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    /// Server-side creation timestamp (advisory; order by `version`).
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn event_type_serializes_dotted() {
        let event = DraftEvent {
            draft_id: DraftId::new(),
            version: 3,
            event_type: DraftEventType::PickMade,
            payload: serde_json::json!({ "pick_number": 3 }),
            created_at: Utc::now(),
        };
        let Ok(json) = serde_json::to_string(&event) else {
            panic!("serialization failed");
        };
        assert!(json.contains("\"draft.pick.made\""));
        assert!(json.contains("\"version\":3"));
    }

    #[test]
    fn event_type_parses_its_own_string() {
        for event_type in [
            DraftEventType::DraftStarted,
            DraftEventType::PickExpired,
            DraftEventType::SeasonCancelled,
        ] {
            let parsed: Result<DraftEventType, _> = event_type.as_str().parse();
            assert!(matches!(parsed, Ok(t) if t == event_type));
        }
        assert!("draft.exploded".parse::<DraftEventType>().is_err());
    }
}
