//! Draft lifecycle state machine.
//!
//! A pure function from `(current, requested)` to the next status plus the
//! timestamps the transition stamps. Event emission and persistence are the
//! caller's job.
//!
//! ```text
//! PENDING ──► IN_PROGRESS ◄──► PAUSED
//!    │            │   │           │
//!    │            │   └──► COMPLETED
//!    └────────────┴────────► CANCELLED ◄─┘
//! ```

use chrono::{DateTime, Utc};

use super::DraftStatus;
use crate::error::DraftError;

/// Outcome of a legal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Status before the transition.
    pub from: DraftStatus,
    /// Status after the transition.
    pub next: DraftStatus,
    /// Start timestamp after the transition; set on first entry into
    /// `IN_PROGRESS` and carried unchanged afterwards.
    pub started_at: Option<DateTime<Utc>>,
    /// Completion timestamp, set when entering a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Returns `true` if the edge `from -> to` is allowed.
#[must_use]
pub const fn is_allowed(from: DraftStatus, to: DraftStatus) -> bool {
    use DraftStatus::{Cancelled, Completed, InProgress, Paused, Pending};
    matches!(
        (from, to),
        (Pending, InProgress)
            | (Pending, Cancelled)
            | (InProgress, Paused)
            | (Paused, InProgress)
            | (InProgress, Completed)
            | (InProgress, Cancelled)
            | (Paused, Cancelled)
    )
}

/// Validates a transition and computes its timestamp effects.
///
/// # Errors
///
/// - [`DraftError::SameStatus`] when `requested == current`.
/// - [`DraftError::TransitionNotAllowed`] for any other disallowed edge.
pub fn transition(
    current: DraftStatus,
    requested: DraftStatus,
    started_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Transition, DraftError> {
    if current == requested {
        return Err(DraftError::SameStatus(current));
    }
    if !is_allowed(current, requested) {
        return Err(DraftError::TransitionNotAllowed {
            from: current,
            to: requested,
        });
    }

    let started_at = match requested {
        DraftStatus::InProgress => started_at.or(Some(now)),
        _ => started_at,
    };
    let completed_at = requested.is_terminal().then_some(now);

    Ok(Transition {
        from: current,
        next: requested,
        started_at,
        completed_at,
    })
}

/// Parses both states from their stored string form before validating.
///
/// # Errors
///
/// Returns [`DraftError::UnknownStatus`] if either string is not a known
/// state, otherwise the errors of [`transition`].
pub fn transition_str(
    current: &str,
    requested: &str,
    started_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Transition, DraftError> {
    let current: DraftStatus = current.parse()?;
    let requested: DraftStatus = requested.parse()?;
    transition(current, requested, started_at, now)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::Duration;

    const ALL: [DraftStatus; 5] = [
        DraftStatus::Pending,
        DraftStatus::InProgress,
        DraftStatus::Paused,
        DraftStatus::Completed,
        DraftStatus::Cancelled,
    ];

    #[test]
    fn terminal_states_reject_everything() {
        let now = Utc::now();
        for from in [DraftStatus::Completed, DraftStatus::Cancelled] {
            for to in ALL {
                assert!(transition(from, to, Some(now), now).is_err(), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn pending_only_starts_or_cancels() {
        let now = Utc::now();
        let allowed: Vec<DraftStatus> = ALL
            .into_iter()
            .filter(|to| transition(DraftStatus::Pending, *to, None, now).is_ok())
            .collect();
        assert_eq!(allowed, vec![DraftStatus::InProgress, DraftStatus::Cancelled]);
    }

    #[test]
    fn self_transition_is_same_status_error() {
        let now = Utc::now();
        let result = transition(DraftStatus::Paused, DraftStatus::Paused, None, now);
        assert!(matches!(result, Err(DraftError::SameStatus(DraftStatus::Paused))));
    }

    #[test]
    fn disallowed_edge_is_reported() {
        let now = Utc::now();
        let result = transition(DraftStatus::Paused, DraftStatus::Completed, None, now);
        assert!(matches!(
            result,
            Err(DraftError::TransitionNotAllowed {
                from: DraftStatus::Paused,
                to: DraftStatus::Completed
            })
        ));
    }

    #[test]
    fn unknown_state_string_is_reported() {
        let now = Utc::now();
        let result = transition_str("PENDING", "LIVE", None, now);
        assert!(matches!(result, Err(DraftError::UnknownStatus(s)) if s == "LIVE"));
    }

    #[test]
    fn first_start_stamps_and_resume_preserves() {
        let t0 = Utc::now();
        let Ok(start) = transition(DraftStatus::Pending, DraftStatus::InProgress, None, t0) else {
            panic!("start must be allowed");
        };
        assert_eq!(start.started_at, Some(t0));

        let t1 = t0 + Duration::minutes(3);
        let Ok(resume) = transition(DraftStatus::Paused, DraftStatus::InProgress, Some(t0), t1)
        else {
            panic!("resume must be allowed");
        };
        assert_eq!(resume.started_at, Some(t0));
        assert_eq!(resume.completed_at, None);
    }

    #[test]
    fn terminal_entry_stamps_completion() {
        let now = Utc::now();
        let Ok(done) = transition(DraftStatus::InProgress, DraftStatus::Completed, Some(now), now)
        else {
            panic!("complete must be allowed");
        };
        assert_eq!(done.completed_at, Some(now));

        let Ok(cancelled) = transition(DraftStatus::Paused, DraftStatus::Cancelled, None, now)
        else {
            panic!("cancel must be allowed");
        };
        assert_eq!(cancelled.completed_at, Some(now));
    }
}
