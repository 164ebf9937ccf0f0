//! Log handlers: ingest one, ingest many, list recent, statistics.

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    CreateLogResponse, GenerateRequest, GenerateResponse, LogsQuery, RecentLogsResponse,
    StatsResponse,
};
use crate::app_state::AppState;
use crate::error::{ApiError, ErrorResponse, TrackerError};

/// `GET /`: Generate one event, record it, and store it.
///
/// # Errors
///
/// Returns [`ApiError`] (500) if the event could not be persisted.
#[utoipa::path(
    get,
    path = "/",
    tag = "Logs",
    summary = "Generate and store one log entry",
    description = "Draws a synthetic event, records it in the metrics registry, and persists it. Metrics are recorded even when persistence fails.",
    responses(
        (status = 200, description = "Log entry created and saved", body = CreateLogResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse),
    )
)]
pub async fn create_log(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let log = state
        .ingestion
        .ingest_generated()
        .await
        .map_err(ApiError::context("Failed to create log entry"))?;

    Ok(Json(CreateLogResponse {
        message: "Log entry created and saved".to_string(),
        log,
    }))
}

/// `GET /logs`: Most recent stored events.
///
/// # Errors
///
/// Returns [`ApiError`] (500) on a malformed or non-positive limit, or on
/// storage failure.
#[utoipa::path(
    get,
    path = "/logs",
    tag = "Logs",
    summary = "List recent log entries",
    description = "Returns up to `limit` stored events, newest first.",
    params(LogsQuery),
    responses(
        (status = 200, description = "Recent logs retrieved", body = RecentLogsResponse),
        (status = 500, description = "Invalid limit or storage failure", body = ErrorResponse),
    )
)]
pub async fn list_logs(
    State(state): State<AppState>,
    params: Result<Query<LogsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    const CONTEXT: &str = "Failed to fetch logs";

    let Query(params) = params
        .map_err(|e| TrackerError::InvalidArgument(format!("invalid query string: {}", e.body_text())))
        .map_err(ApiError::context(CONTEXT))?;
    let logs = state
        .queries
        .recent_logs(params.limit_or_default())
        .await
        .map_err(ApiError::context(CONTEXT))?;

    Ok(Json(RecentLogsResponse {
        message: "Recent logs retrieved".to_string(),
        count: logs.len(),
        logs,
    }))
}

/// `GET /stats`: Per-service, per-level aggregates.
///
/// # Errors
///
/// Returns [`ApiError`] (500) on storage failure.
#[utoipa::path(
    get,
    path = "/stats",
    tag = "Logs",
    summary = "Log statistics",
    description = "Returns the storage layer's pre-aggregated statistics, ordered by service and level.",
    responses(
        (status = 200, description = "Log statistics retrieved", body = StatsResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse),
    )
)]
pub async fn log_stats(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let stats = state
        .queries
        .stats()
        .await
        .map_err(ApiError::context("Failed to fetch statistics"))?;

    Ok(Json(StatsResponse {
        message: "Log statistics retrieved".to_string(),
        stats,
    }))
}

/// `POST /generate`: Generate and store several events in sequence.
///
/// # Errors
///
/// Returns [`ApiError`] (500) on a malformed body, a non-positive count, or
/// the first storage failure.
#[utoipa::path(
    post,
    path = "/generate",
    tag = "Logs",
    summary = "Bulk generate log entries",
    description = "Generates `count` events (default 10) one after another. Stops at the first storage failure.",
    request_body(content = GenerateRequest, description = "Optional; an empty body generates 10 events"),
    responses(
        (status = 200, description = "Log entries generated and saved", body = GenerateResponse),
        (status = 500, description = "Invalid count or storage failure", body = ErrorResponse),
    )
)]
pub async fn generate_logs(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    const CONTEXT: &str = "Failed to generate logs";

    let request = parse_generate_request(&body).map_err(ApiError::context(CONTEXT))?;
    let count = request.count_or_default();
    let logs = state
        .ingestion
        .ingest_bulk(count)
        .await
        .map_err(ApiError::context(CONTEXT))?;

    Ok(Json(GenerateResponse {
        message: format!("{count} log entries generated and saved"),
        logs,
    }))
}

/// An empty or whitespace-only body means "use the defaults".
fn parse_generate_request(body: &[u8]) -> Result<GenerateRequest, TrackerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(GenerateRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| TrackerError::InvalidArgument(format!("invalid request body: {e}")))
}

/// Log routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(create_log))
        .route("/logs", get(list_logs))
        .route("/stats", get(log_stats))
        .route("/generate", post(generate_logs))
}
