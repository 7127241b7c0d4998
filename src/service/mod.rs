//! Service layer: business logic orchestration.
//!
//! Every mutation follows the same pattern: open a [`DraftTx`] (the draft's
//! exclusive lock), validate, write, append events, commit, then publish the
//! committed events through the injected [`EventSink`]. A failure before
//! commit drops the transaction, so nothing is written and nothing is
//! published.

pub mod autodraft;
pub mod draft_service;
pub mod fanout;
pub mod pick_service;
pub mod sweeper;
pub mod timer_service;

pub use draft_service::{
    AutodraftSettings, DraftService, DraftSnapshot, ResultEntry, Standing, TurnInfo,
};
pub use fanout::DraftObserver;
pub use pick_service::{PickOutcome, PickRequest, PickService, PickSource};
pub use sweeper::{DeadlineSweeper, SweepReport, SweeperSettings};
pub use timer_service::{TickMode, TickOutcome, TimerService};

use crate::domain::{DraftEvent, EventSink};
use crate::error::DraftError;
use crate::persistence::DraftTx;

/// Commits `tx` and publishes the events it appended, in version order.
///
/// # Errors
///
/// Returns the store's error if the commit fails; nothing is published then.
pub(crate) async fn commit_and_publish(
    tx: Box<dyn DraftTx>,
    sink: &dyn EventSink,
) -> Result<Vec<DraftEvent>, DraftError> {
    let events = tx.commit().await?;
    for event in &events {
        sink.publish(event.clone());
    }
    Ok(events)
}
