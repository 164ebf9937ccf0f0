//! Log events as generated, persisted, and aggregated.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::TrackerError;

/// Severity of a generated log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Informational.
    Info,
    /// Warning.
    Warn,
    /// Error.
    Error,
    /// Debug.
    Debug,
}

impl LogLevel {
    /// Every level, in generation order.
    pub const ALL: [Self; 4] = [Self::Info, Self::Warn, Self::Error, Self::Debug];

    /// Returns the canonical upper-case name stored in the database and
    /// used as a metric label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INFO" => Ok(Self::Info),
            "WARN" => Ok(Self::Warn),
            "ERROR" => Ok(Self::Error),
            "DEBUG" => Ok(Self::Debug),
            other => Err(TrackerError::InvalidArgument(format!(
                "unknown log level: {other}"
            ))),
        }
    }
}

/// Resource measurements attached to every event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventMetrics {
    /// Response time in milliseconds (non-negative).
    pub response_time_ms: f64,
    /// CPU usage in percent, `0.0..=100.0`.
    pub cpu_usage_percent: f64,
    /// Memory usage in megabytes (non-negative).
    pub memory_usage_mb: f64,
}

/// A synthetic operational event. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Generation time, serialized as ISO-8601.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: LogLevel,
    /// Emitting service, drawn from a bounded set.
    pub service: String,
    /// Free-form message.
    pub message: String,
    /// Short request correlation id.
    pub request_id: String,
    /// Resource measurements.
    pub metrics: EventMetrics,
}

/// An [`Event`] after the storage layer accepted it.
///
/// Only a [`crate::persistence::LogStore`] insert creates one. Serializes
/// as the event's own fields plus `id` and `savedAt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersistedEvent {
    /// Storage-assigned, monotonically increasing row id.
    pub id: i64,
    /// The event as it was generated.
    #[serde(flatten)]
    pub event: Event,
    /// Storage-assigned creation time.
    pub saved_at: DateTime<Utc>,
}

/// One `(service, level)` row of the storage layer's pre-aggregated view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedStat {
    /// Service name.
    pub service: String,
    /// Log level name as stored.
    pub level: String,
    /// Number of events in the group.
    pub count: i64,
    /// Average response time in milliseconds.
    pub avg_response_time: f64,
    /// Average CPU usage in percent.
    pub avg_cpu_usage: f64,
    /// Average memory usage in megabytes.
    pub avg_memory_usage: f64,
}
