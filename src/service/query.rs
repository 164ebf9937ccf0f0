//! Read-side queries over persisted events.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use crate::domain::{AggregatedStat, PersistedEvent};
use crate::error::TrackerError;
use crate::metrics::{AppMetrics, DbOperation, DbStatus};
use crate::persistence::LogStore;

/// Thin, uncached wrapper around the store's read operations that counts
/// each one as a `select` in the database metrics.
#[derive(Debug, Clone)]
pub struct AggregationQueryService {
    metrics: AppMetrics,
    store: Arc<dyn LogStore>,
}

impl AggregationQueryService {
    /// Creates a new `AggregationQueryService`.
    #[must_use]
    pub fn new(metrics: AppMetrics, store: Arc<dyn LogStore>) -> Self {
        Self { metrics, store }
    }

    /// Returns up to `limit` events, newest first.
    ///
    /// # Errors
    ///
    /// Propagates [`LogStore::list_recent_events`] errors, including
    /// [`TrackerError::InvalidArgument`] for `limit < 1`.
    pub async fn recent_logs(&self, limit: i64) -> Result<Vec<PersistedEvent>, TrackerError> {
        self.timed(self.store.list_recent_events(limit)).await
    }

    /// Returns the per-`(service, level)` aggregates as the store computed
    /// them.
    ///
    /// # Errors
    ///
    /// Propagates [`LogStore::fetch_aggregated_stats`] errors.
    pub async fn stats(&self) -> Result<Vec<AggregatedStat>, TrackerError> {
        self.timed(self.store.fetch_aggregated_stats()).await
    }

    async fn timed<T>(
        &self,
        query: impl Future<Output = Result<T, TrackerError>>,
    ) -> Result<T, TrackerError> {
        let started = Instant::now();
        let result = query.await;
        match &result {
            Ok(_) => self.metrics.record_db_operation(
                DbOperation::Select,
                DbStatus::Success,
                Some(started.elapsed()),
            )?,
            Err(err) => {
                tracing::warn!(error = %err, "select failed");
                self.metrics
                    .record_db_operation(DbOperation::Select, DbStatus::Error, None)?;
            }
        }
        result
    }
}
