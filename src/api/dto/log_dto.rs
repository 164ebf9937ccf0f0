//! Log ingestion and query DTOs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{AggregatedStat, PersistedEvent};
use crate::persistence::DEFAULT_RECENT_LIMIT;

/// Number of events `POST /generate` creates when the body omits `count`.
pub const DEFAULT_GENERATE_COUNT: i64 = 10;

/// Response body for `GET /`.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateLogResponse {
    /// Outcome summary.
    pub message: String,
    /// The event as stored.
    pub log: PersistedEvent,
}

/// Query parameters for `GET /logs`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LogsQuery {
    /// Maximum number of events to return. Defaults to 50; must be positive.
    #[serde(default)]
    pub limit: Option<i64>,
}

impl LogsQuery {
    /// The requested limit, or the default when absent.
    #[must_use]
    pub fn limit_or_default(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_RECENT_LIMIT)
    }
}

/// Response body for `GET /logs`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RecentLogsResponse {
    /// Outcome summary.
    pub message: String,
    /// Number of events returned.
    pub count: usize,
    /// Events, newest first.
    pub logs: Vec<PersistedEvent>,
}

/// Response body for `GET /stats`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    /// Outcome summary.
    pub message: String,
    /// Aggregates ordered by service, then level.
    pub stats: Vec<AggregatedStat>,
}

/// Request body for `POST /generate`. The whole body is optional.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct GenerateRequest {
    /// How many events to generate. Defaults to 10; must be positive.
    #[serde(default)]
    pub count: Option<i64>,
}

impl GenerateRequest {
    /// The requested count, or the default when absent.
    #[must_use]
    pub fn count_or_default(&self) -> i64 {
        self.count.unwrap_or(DEFAULT_GENERATE_COUNT)
    }
}

/// Response body for `POST /generate`.
#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateResponse {
    /// Outcome summary.
    pub message: String,
    /// Stored events in generation order.
    pub logs: Vec<PersistedEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        assert_eq!(LogsQuery { limit: None }.limit_or_default(), 50);
        assert_eq!(LogsQuery { limit: Some(5) }.limit_or_default(), 5);
        assert_eq!(GenerateRequest::default().count_or_default(), 10);
    }

    #[test]
    fn generate_request_accepts_empty_object() {
        let parsed: Result<GenerateRequest, _> = serde_json::from_str("{}");
        assert!(matches!(parsed, Ok(GenerateRequest { count: None })));
        let parsed: Result<GenerateRequest, _> = serde_json::from_str(r#"{"count": 3}"#);
        assert!(matches!(parsed, Ok(GenerateRequest { count: Some(3) })));
    }
}
