//! WebSocket layer: connection handling and message routing.
//!
//! The WebSocket endpoint at `/ws` streams the events of the drafts a
//! client subscribes to, replaying a backlog on request.

pub mod connection;
pub mod handler;
pub mod messages;
