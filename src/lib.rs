//! # draft-gateway
//!
//! Live snake-draft turn engine with a REST and WebSocket gateway.
//!
//! Participants of a season take turns picking nominations from a ceremony's
//! pool. The engine decides whose turn it is, validates and records picks
//! exactly once, enforces pick deadlines (autopicking on expiry when a seat
//! has autodraft enabled), and streams a versioned event log to subscribers.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)
//!     ├── WS Handler (ws/) ── DraftObserver (ordered, gap-free delivery)
//!     │
//!     ├── DraftService / PickService / TimerService (service/)
//!     ├── DeadlineSweeper ── ClusterMutex
//!     ├── EventBus (domain/) ◄── NotifyRelay (other instances)
//!     │
//!     ├── Turn order, state machine (domain/)
//!     │
//!     └── DraftStore: PostgreSQL or in-memory (persistence/)
//! ```
//!
//! Every mutation of a draft runs inside one [`persistence::DraftTx`] that
//! holds the draft's lock; the events it appends are published only after
//! the transaction commits.

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
