//! OpenAPI document and its routes.

use axum::Router;
use utoipa::OpenApi;

use crate::api::dto::{
    CreateLogResponse, GenerateRequest, GenerateResponse, RecentLogsResponse, StatsResponse,
};
use crate::api::handlers;
use crate::app_state::AppState;
use crate::domain::{AggregatedStat, Event, EventMetrics, LogLevel, PersistedEvent};
use crate::error::ErrorResponse;

/// Path the OpenAPI JSON is served from.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// OpenAPI description of every route.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "log-tracker",
        description = "Synthetic log ingestion with Prometheus metrics and PostgreSQL persistence."
    ),
    paths(
        handlers::logs::create_log,
        handlers::logs::list_logs,
        handlers::logs::log_stats,
        handlers::logs::generate_logs,
        handlers::system::health_handler,
        handlers::system::metrics_handler,
    ),
    components(schemas(
        Event,
        EventMetrics,
        LogLevel,
        PersistedEvent,
        AggregatedStat,
        CreateLogResponse,
        RecentLogsResponse,
        StatsResponse,
        GenerateRequest,
        GenerateResponse,
        ErrorResponse,
    )),
    tags(
        (name = "Logs", description = "Event ingestion and queries"),
        (name = "System", description = "Health and metrics"),
    )
)]
pub struct ApiDoc;

/// Serves the document, plus Swagger UI at `/swagger-ui` when the
/// `swagger-ui` feature is enabled.
#[cfg(feature = "swagger-ui")]
pub fn routes() -> Router<AppState> {
    Router::new().merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url(OPENAPI_PATH, ApiDoc::openapi()),
    )
}

/// Serves the document.
#[cfg(not(feature = "swagger-ui"))]
pub fn routes() -> Router<AppState> {
    use axum::Json;
    use axum::routing::get;

    Router::new().route(OPENAPI_PATH, get(|| async { Json(ApiDoc::openapi()) }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in ["/", "/logs", "/stats", "/generate", "/health", "/metrics"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
