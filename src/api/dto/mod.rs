//! Data Transfer Objects for REST request/response serialization.
//!
//! Domain types that are already wire-shaped (`Draft`, `DraftPick`,
//! `DraftEvent`, `AutodraftConfig`) are returned directly; the DTOs here
//! cover request bodies and composite responses.

pub mod common_dto;
pub mod draft_dto;
pub mod pick_dto;

pub use common_dto::*;
pub use draft_dto::*;
pub use pick_dto::*;
