//! System endpoints: health check and metrics scrape.

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::HealthResponse;
use crate::app_state::AppState;
use crate::error::{ApiError, ErrorResponse};
use crate::metrics::EXPOSITION_CONTENT_TYPE;
use crate::service::HealthStatus;

/// `GET /health`: Storage connectivity and pool state.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Probes storage with a round-trip query. Healthy responses include the pool snapshot; unhealthy ones include the probe error.",
    responses(
        (status = 200, description = "Storage reachable", body = serde_json::Value),
        (status = 503, description = "Storage unreachable", body = serde_json::Value),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.health.check().await;
    let status = match report.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(HealthResponse::from(report)))
}

/// `GET /metrics`: Prometheus scrape endpoint.
///
/// Refreshes the connection pool gauges before rendering; if storage is
/// unreachable the gauges keep their last values and the scrape still
/// succeeds.
///
/// # Errors
///
/// Returns [`ApiError`] (500) if the registry rejects the gauge update.
#[utoipa::path(
    get,
    path = "/metrics",
    tag = "System",
    summary = "Prometheus metrics",
    description = "Returns every instrument in the Prometheus text exposition format.",
    responses(
        (status = 200, description = "Exposition text", body = String, content_type = "text/plain"),
        (status = 500, description = "Registry failure", body = ErrorResponse),
    )
)]
pub async fn metrics_handler(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let pool_state = state.health.pool_state().await;
    state
        .metrics
        .update_pool_gauges(&pool_state)
        .map_err(ApiError::context("Failed to render metrics"))?;

    Ok((
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        state.metrics.render(),
    ))
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
}
