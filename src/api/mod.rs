//! REST API layer: route handlers, DTOs, and router composition.
//!
//! This is the transport adapter: every handler maps one route onto one
//! service call and turns the outcome into JSON or exposition text.

pub mod dto;
pub mod handlers;
pub mod openapi;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Builds the complete API router with all endpoints and API docs.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .merge(handlers::routes())
        .merge(openapi::routes())
}

/// Builds the servable application: routes, HTTP tracing, CORS, and state.
pub fn app(state: AppState) -> Router {
    build_router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
