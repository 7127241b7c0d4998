//! Draft engine error types with HTTP status code mapping.
//!
//! [`DraftError`] is the central error type. Every variant belongs to one
//! [`ErrorKind`], carries a stable numeric code, and can render a structured
//! `details` payload so callers can explain a rejection to the user.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{DraftId, DraftOrderType, DraftStatus, NominationId, ParticipantId, SeasonId};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2003,
///     "kind": "state_conflict",
///     "message": "not your turn: pick 4 belongs to seat 3",
///     "retryable": false,
///     "details": { "pick_number": 4, "expected_seat": 3 }
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`DraftError`]).
    pub code: u32,
    /// Error category.
    pub kind: ErrorKind,
    /// Human-readable error message.
    pub message: String,
    /// Whether the caller may retry the same request unchanged.
    pub retryable: bool,
    /// Optional structured details.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
}

/// Error category, independent of representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input; rejected before any mutation.
    Validation,
    /// Operation not legal in the draft's current state.
    StateConflict,
    /// Lost a race against a concurrent writer; safe to retry.
    ConcurrencyConflict,
    /// Referenced entity does not exist.
    NotFound,
    /// Infrastructure or unexpected failure.
    Internal,
}

/// Draft engine error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Kind                 | HTTP Status                |
/// |-----------|----------------------|----------------------------|
/// | 1000–1999 | Validation           | 400 Bad Request            |
/// | 2000–2999 | State conflict       | 409 Conflict               |
/// | 3000–3999 | Concurrency conflict | 409 Conflict (retryable)   |
/// | 4000–4999 | Not found            | 404 Not Found              |
/// | 5000–5999 | Internal             | 500 Internal Server Error  |
#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Turn order inputs must be positive integers.
    #[error("invalid turn input: seat_count={seat_count}, pick_number={pick_number}")]
    InvalidTurnInput {
        /// Seat count supplied.
        seat_count: i32,
        /// Pick number supplied.
        pick_number: i32,
    },

    /// The order type is recognised but not supported.
    #[error("unsupported draft order: {0}")]
    UnsupportedOrder(DraftOrderType),

    /// A status string could not be parsed.
    #[error("unknown draft status: {0}")]
    UnknownStatus(String),

    /// A transition to the state the draft is already in.
    #[error("draft is already {0}")]
    SameStatus(DraftStatus),

    /// A transition along an edge the state machine does not allow.
    #[error("transition {from} -> {to} is not allowed")]
    TransitionNotAllowed {
        /// Current status.
        from: DraftStatus,
        /// Requested status.
        to: DraftStatus,
    },

    /// The draft is not in the status the operation requires.
    #[error("draft {draft_id} is {status}, expected {expected}")]
    DraftNotActive {
        /// Draft identifier.
        draft_id: DraftId,
        /// Current status.
        status: DraftStatus,
        /// Status the operation requires.
        expected: DraftStatus,
    },

    /// The requester does not occupy the seat on the clock.
    #[error("not your turn: pick {pick_number} belongs to seat {expected_seat}")]
    NotYourTurn {
        /// Pick currently on the clock.
        pick_number: i32,
        /// Seat that owns the pick.
        expected_seat: i32,
        /// Participant who attempted the pick.
        participant_id: ParticipantId,
    },

    /// The nomination was already drafted in this draft.
    #[error("nomination {0} has already been drafted")]
    NominationTaken(NominationId),

    /// The nomination belongs to another ceremony.
    #[error("nomination {0} is not part of this draft's ceremony")]
    NominationNotInCeremony(NominationId),

    /// The ceremony's draft lock has passed and no override is active.
    #[error("draft {0} is locked by its ceremony")]
    DraftLocked(DraftId),

    /// The pick slot is already filled; picks are append-only.
    #[error("pick {pick_number} of draft {draft_id} is filled and immutable")]
    PickImmutable {
        /// Draft identifier.
        draft_id: DraftId,
        /// Filled pick number.
        pick_number: i32,
    },

    /// The season roster has no participants to seat.
    #[error("season {0} has an empty roster")]
    EmptyRoster(SeasonId),

    /// A concurrent submission already claimed this pick number.
    #[error("pick {pick_number} of draft {draft_id} was claimed concurrently; retry")]
    PickConflict {
        /// Draft identifier.
        draft_id: DraftId,
        /// Contested pick number.
        pick_number: i32,
    },

    /// Draft with the given ID was not found.
    #[error("draft not found: {0}")]
    DraftNotFound(DraftId),

    /// No draft exists for the given season.
    #[error("no draft for season: {0}")]
    SeasonNotFound(SeasonId),

    /// Participant holds no seat in the draft.
    #[error("participant {participant_id} has no seat in draft {draft_id}")]
    SeatNotFound {
        /// Draft identifier.
        draft_id: DraftId,
        /// Participant identifier.
        participant_id: ParticipantId,
    },

    /// Nomination with the given ID was not found.
    #[error("nomination not found: {0}")]
    NominationNotFound(NominationId),

    /// No pick exists at the given pick number.
    #[error("pick {pick_number} of draft {draft_id} not found")]
    PickNotFound {
        /// Draft identifier.
        draft_id: DraftId,
        /// Requested pick number.
        pick_number: i32,
    },

    /// No autodraft configuration exists for the participant.
    #[error("no autodraft config for participant {participant_id} in draft {draft_id}")]
    AutodraftConfigNotFound {
        /// Draft identifier.
        draft_id: DraftId,
        /// Participant identifier.
        participant_id: ParticipantId,
    },

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DraftError {
    /// Returns the error category for this variant.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidTurnInput { .. }
            | Self::UnsupportedOrder(_)
            | Self::UnknownStatus(_) => ErrorKind::Validation,
            Self::SameStatus(_)
            | Self::TransitionNotAllowed { .. }
            | Self::DraftNotActive { .. }
            | Self::NotYourTurn { .. }
            | Self::NominationTaken(_)
            | Self::NominationNotInCeremony(_)
            | Self::DraftLocked(_)
            | Self::PickImmutable { .. }
            | Self::EmptyRoster(_) => ErrorKind::StateConflict,
            Self::PickConflict { .. } => ErrorKind::ConcurrencyConflict,
            Self::DraftNotFound(_)
            | Self::SeasonNotFound(_)
            | Self::SeatNotFound { .. }
            | Self::NominationNotFound(_)
            | Self::PickNotFound { .. }
            | Self::AutodraftConfigNotFound { .. } => ErrorKind::NotFound,
            Self::PersistenceError(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidTurnInput { .. } => 1002,
            Self::UnsupportedOrder(_) => 1003,
            Self::UnknownStatus(_) => 1004,
            Self::SameStatus(_) => 2001,
            Self::TransitionNotAllowed { .. } => 2002,
            Self::DraftNotActive { .. } => 2003,
            Self::NotYourTurn { .. } => 2004,
            Self::NominationTaken(_) => 2005,
            Self::NominationNotInCeremony(_) => 2006,
            Self::DraftLocked(_) => 2007,
            Self::PickImmutable { .. } => 2008,
            Self::EmptyRoster(_) => 2009,
            Self::PickConflict { .. } => 3001,
            Self::DraftNotFound(_) => 4001,
            Self::SeasonNotFound(_) => 4002,
            Self::SeatNotFound { .. } => 4003,
            Self::NominationNotFound(_) => 4004,
            Self::PickNotFound { .. } => 4005,
            Self::AutodraftConfigNotFound { .. } => 4006,
            Self::PersistenceError(_) => 5001,
            Self::Internal(_) => 5000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::StateConflict | ErrorKind::ConcurrencyConflict => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` if the identical request may succeed when retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::ConcurrencyConflict)
    }

    /// Returns structured details describing the rejection, if any.
    #[must_use]
    pub fn details(&self) -> Option<serde_json::Value> {
        let details = match self {
            Self::InvalidTurnInput {
                seat_count,
                pick_number,
            } => serde_json::json!({ "seat_count": seat_count, "pick_number": pick_number }),
            Self::SameStatus(status) => serde_json::json!({ "status": status }),
            Self::TransitionNotAllowed { from, to } => {
                serde_json::json!({ "from": from, "to": to })
            }
            Self::DraftNotActive {
                draft_id,
                status,
                expected,
            } => serde_json::json!({
                "draft_id": draft_id,
                "status": status,
                "expected": expected,
            }),
            Self::NotYourTurn {
                pick_number,
                expected_seat,
                participant_id,
            } => serde_json::json!({
                "pick_number": pick_number,
                "expected_seat": expected_seat,
                "participant_id": participant_id,
            }),
            Self::NominationTaken(id)
            | Self::NominationNotInCeremony(id)
            | Self::NominationNotFound(id) => serde_json::json!({ "nomination_id": id }),
            Self::PickImmutable {
                draft_id,
                pick_number,
            }
            | Self::PickConflict {
                draft_id,
                pick_number,
            }
            | Self::PickNotFound {
                draft_id,
                pick_number,
            } => serde_json::json!({ "draft_id": draft_id, "pick_number": pick_number }),
            Self::SeatNotFound {
                draft_id,
                participant_id,
            }
            | Self::AutodraftConfigNotFound {
                draft_id,
                participant_id,
            } => serde_json::json!({ "draft_id": draft_id, "participant_id": participant_id }),
            _ => return None,
        };
        Some(details)
    }
}

impl From<sqlx::Error> for DraftError {
    fn from(err: sqlx::Error) -> Self {
        Self::PersistenceError(err.to_string())
    }
}

impl IntoResponse for DraftError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                kind: self.kind(),
                message: self.to_string(),
                retryable: self.is_retryable(),
                details: self.details(),
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_failures_are_distinguishable() {
        let unknown = DraftError::UnknownStatus("DRAFTING".to_string());
        let same = DraftError::SameStatus(DraftStatus::Paused);
        let edge = DraftError::TransitionNotAllowed {
            from: DraftStatus::Completed,
            to: DraftStatus::InProgress,
        };
        assert_eq!(unknown.kind(), ErrorKind::Validation);
        assert_eq!(same.kind(), ErrorKind::StateConflict);
        assert_ne!(same.error_code(), edge.error_code());
    }

    #[test]
    fn concurrency_conflict_is_retryable() {
        let err = DraftError::PickConflict {
            draft_id: DraftId::new(),
            pick_number: 4,
        };
        assert!(err.is_retryable());
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(!DraftError::NominationTaken(NominationId::new()).is_retryable());
    }

    #[test]
    fn not_found_is_distinct_from_validation() {
        let err = DraftError::DraftNotFound(DraftId::new());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            DraftError::InvalidRequest("x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn not_your_turn_has_details() {
        let participant_id = ParticipantId::new();
        let err = DraftError::NotYourTurn {
            pick_number: 4,
            expected_seat: 3,
            participant_id,
        };
        let Some(details) = err.details() else {
            panic!("expected details");
        };
        assert_eq!(details["expected_seat"], 3);
        assert_eq!(details["pick_number"], 4);
    }
}
