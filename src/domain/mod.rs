//! Domain layer: draft model, lifecycle rules, turn order, and events.
//!
//! Everything here is pure or in-process: the draft aggregate and its
//! catalog types, the lifecycle state machine, the snake turn calculator,
//! the versioned event type, the broadcast bus that fans events out, and the
//! clock abstraction deadlines are computed against.

pub mod clock;
pub mod draft;
pub mod draft_event;
pub mod event_bus;
pub mod ids;
pub mod state_machine;
pub mod turn_order;

pub use clock::{Clock, ManualClock, SystemClock};
pub use draft::{
    AutodraftConfig, AutodraftStrategy, Ceremony, Draft, DraftOrderType, DraftPick, DraftPlan,
    DraftResult, DraftSeat, DraftStatus, Nomination, RemainderStrategy,
};
pub use draft_event::{DraftEvent, DraftEventType};
pub use event_bus::{EventBus, EventSink};
pub use ids::{CeremonyId, DraftId, NominationId, ParticipantId, PlanId, SeasonId};
pub use state_machine::Transition;
pub use turn_order::{TurnAssignment, seat_for_pick};
