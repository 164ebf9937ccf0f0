//! Database row types for the `logs` table and `log_stats` view.

use chrono::{DateTime, Utc};

use crate::domain::{AggregatedStat, Event, EventMetrics, PersistedEvent};
use crate::error::TrackerError;

/// A stored row from the `logs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LogRow {
    /// Auto-increment row ID.
    pub id: i64,
    /// Event generation time.
    pub timestamp: DateTime<Utc>,
    /// Level name as stored.
    pub level: String,
    /// Service name.
    pub service: String,
    /// Event message.
    pub message: String,
    /// Request correlation id.
    pub request_id: String,
    /// Response time in milliseconds.
    pub response_time: f64,
    /// CPU usage in percent.
    pub cpu_usage: f64,
    /// Memory usage in megabytes.
    pub memory_usage: f64,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<LogRow> for PersistedEvent {
    type Error = TrackerError;

    fn try_from(row: LogRow) -> Result<Self, Self::Error> {
        let level = row
            .level
            .parse()
            .map_err(|_| TrackerError::Persistence(format!("row {} has level {:?}", row.id, row.level)))?;
        Ok(Self {
            id: row.id,
            event: Event {
                timestamp: row.timestamp,
                level,
                service: row.service,
                message: row.message,
                request_id: row.request_id,
                metrics: EventMetrics {
                    response_time_ms: row.response_time,
                    cpu_usage_percent: row.cpu_usage,
                    memory_usage_mb: row.memory_usage,
                },
            },
            saved_at: row.created_at,
        })
    }
}

/// A row from the `log_stats` view.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LogStatsRow {
    /// Service name.
    pub service: String,
    /// Level name.
    pub level: String,
    /// Events in the group.
    pub count: i64,
    /// Average response time.
    pub avg_response_time: f64,
    /// Average CPU usage.
    pub avg_cpu_usage: f64,
    /// Average memory usage.
    pub avg_memory_usage: f64,
}

impl From<LogStatsRow> for AggregatedStat {
    fn from(row: LogStatsRow) -> Self {
        Self {
            service: row.service,
            level: row.level,
            count: row.count,
            avg_response_time: row.avg_response_time,
            avg_cpu_usage: row.avg_cpu_usage,
            avg_memory_usage: row.avg_memory_usage,
        }
    }
}
