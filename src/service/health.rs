//! Storage health checks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::PoolState;
use crate::persistence::LogStore;

/// Overall verdict of a health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Storage answered the probe.
    Healthy,
    /// Storage did not answer.
    Unhealthy,
}

/// Result of [`HealthCheckService::check`].
#[derive(Debug, Clone, PartialEq)]
pub struct HealthReport {
    /// Verdict derived from `pool_state`.
    pub status: HealthStatus,
    /// When the check ran.
    pub timestamp: DateTime<Utc>,
    /// What the store reported.
    pub pool_state: PoolState,
}

/// Probes the store. Does not touch the metrics registry.
#[derive(Debug, Clone)]
pub struct HealthCheckService {
    store: Arc<dyn LogStore>,
}

impl HealthCheckService {
    /// Creates a new `HealthCheckService`.
    #[must_use]
    pub fn new(store: Arc<dyn LogStore>) -> Self {
        Self { store }
    }

    /// Runs the store's round-trip probe; healthy iff it connected.
    pub async fn check(&self) -> HealthReport {
        let pool_state = self.pool_state().await;
        let status = if pool_state.is_connected() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };
        HealthReport {
            status,
            timestamp: Utc::now(),
            pool_state,
        }
    }

    /// The raw pool snapshot, as used to refresh gauges before a scrape.
    pub async fn pool_state(&self) -> PoolState {
        self.store.pool_health().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[tokio::test]
    async fn healthy_while_store_answers() {
        let store = Arc::new(MemoryStore::new());
        let health = HealthCheckService::new(store);
        let first = health.check().await;
        let second = health.check().await;
        assert_eq!(first.status, HealthStatus::Healthy);
        assert_eq!(second.status, HealthStatus::Healthy);
        assert!(second.timestamp >= first.timestamp);
    }

    #[tokio::test]
    async fn unhealthy_when_store_unreachable() {
        let store = Arc::new(MemoryStore::new());
        store.set_reachable(false);
        let report = HealthCheckService::new(store).check().await;
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert!(report.pool_state.error_message().is_some());
    }

    #[tokio::test]
    async fn unhealthy_after_shutdown() {
        let store = Arc::new(MemoryStore::new());
        store.shutdown().await;
        let report = HealthCheckService::new(store).check().await;
        assert_eq!(report.status, HealthStatus::Unhealthy);
    }
}
