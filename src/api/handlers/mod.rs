//! REST endpoint handlers organized by resource.

pub mod autodraft;
pub mod draft;
pub mod pick;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(draft::routes())
        .merge(pick::routes())
        .merge(autodraft::routes())
}
