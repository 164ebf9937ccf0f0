//! Connection pool snapshot reported by health checks.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Snapshot of the storage connection pool.
///
/// Recomputed on every health check or metrics scrape; never persisted.
/// Serializes with a `status` discriminator of `"connected"` or `"error"`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum PoolState {
    /// The round-trip query succeeded.
    Connected {
        /// Connections currently open (idle plus checked out).
        #[serde(rename = "totalConnections")]
        total_connections: u32,
        /// Open connections not checked out.
        #[serde(rename = "idleConnections")]
        idle_connections: u32,
        /// Callers currently waiting to acquire a connection.
        #[serde(rename = "waitingConnections")]
        waiting_connections: u32,
        /// Server clock as reported by the storage layer.
        #[serde(rename = "currentTime")]
        current_time: DateTime<Utc>,
        /// Server version string.
        version: String,
    },
    /// The round-trip query failed.
    Error {
        /// Failure description.
        error: String,
    },
}

impl PoolState {
    /// Returns `true` when the storage layer answered.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// Returns the failure message for [`PoolState::Error`].
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { error } => Some(error),
            Self::Connected { .. } => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn connected_serializes_with_status_tag() {
        let state = PoolState::Connected {
            total_connections: 3,
            idle_connections: 2,
            waiting_connections: 0,
            current_time: Utc::now(),
            version: "PostgreSQL 16".to_string(),
        };
        let Ok(json) = serde_json::to_value(&state) else {
            panic!("pool state should serialize");
        };
        assert_eq!(json["status"], "connected");
        assert_eq!(json["totalConnections"], 3);
        assert_eq!(json["idleConnections"], 2);
        assert!(state.is_connected());
        assert!(state.error_message().is_none());
    }

    #[test]
    fn error_serializes_message() {
        let state = PoolState::Error {
            error: "connection refused".to_string(),
        };
        let Ok(json) = serde_json::to_value(&state) else {
            panic!("pool state should serialize");
        };
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "connection refused");
        assert_eq!(state.error_message(), Some("connection refused"));
    }
}
