//! REST endpoint handlers organized by resource.

pub mod logs;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes at the root.
pub fn routes() -> Router<AppState> {
    Router::new().merge(logs::routes()).merge(system::routes())
}
