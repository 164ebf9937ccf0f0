//! Health check DTOs.

use serde::Serialize;

use crate::domain::PoolState;
use crate::service::{HealthReport, HealthStatus};

/// Response body for `GET /health`.
///
/// Healthy responses carry the pool snapshot under `database`; unhealthy
/// ones carry the probe's failure under `error`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `"healthy"` or `"unhealthy"`.
    pub status: HealthStatus,
    /// ISO-8601 time of the check.
    pub timestamp: String,
    /// Pool snapshot when storage answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PoolState>,
    /// Probe failure when it did not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<HealthReport> for HealthResponse {
    fn from(report: HealthReport) -> Self {
        let timestamp = report.timestamp.to_rfc3339();
        match report.pool_state {
            PoolState::Error { error } => Self {
                status: report.status,
                timestamp,
                database: None,
                error: Some(error),
            },
            connected @ PoolState::Connected { .. } => Self {
                status: report.status,
                timestamp,
                database: Some(connected),
                error: None,
            },
        }
    }
}
