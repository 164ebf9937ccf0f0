//! Ingestion pipeline: record metrics, then persist.

use std::sync::Arc;
use std::time::Instant;

use crate::domain::{Event, EventSource, PersistedEvent};
use crate::error::TrackerError;
use crate::metrics::{AppMetrics, DbOperation, DbStatus};
use crate::persistence::LogStore;

/// Upper bound on the up-front allocation for a bulk run.
const BULK_PREALLOC_CAP: usize = 1024;

/// Takes events end to end: metrics first, storage second.
///
/// Metric recording always precedes the insert and is never rolled back:
/// the counters describe generated events whether or not storage accepted
/// them.
#[derive(Debug, Clone)]
pub struct IngestionPipeline {
    metrics: AppMetrics,
    store: Arc<dyn LogStore>,
    source: Arc<dyn EventSource>,
}

impl IngestionPipeline {
    /// Creates a new `IngestionPipeline`.
    #[must_use]
    pub fn new(metrics: AppMetrics, store: Arc<dyn LogStore>, source: Arc<dyn EventSource>) -> Self {
        Self {
            metrics,
            store,
            source,
        }
    }

    /// Records `event` into the metrics registry and persists it.
    ///
    /// On success the insert's duration is observed and the event is
    /// counted as saved; on failure only the failed operation is counted.
    ///
    /// # Errors
    ///
    /// Propagates the storage error from [`LogStore::insert_event`], or a
    /// registry error if the instruments are misconfigured.
    pub async fn ingest(&self, event: Event) -> Result<PersistedEvent, TrackerError> {
        self.metrics.record_event(&event)?;

        let started = Instant::now();
        match self.store.insert_event(&event).await {
            Ok(saved) => {
                self.metrics.record_db_operation(
                    DbOperation::Insert,
                    DbStatus::Success,
                    Some(started.elapsed()),
                )?;
                self.metrics.record_log_saved(event.level, &event.service)?;
                tracing::debug!(id = saved.id, level = %event.level, service = %event.service, "event ingested");
                Ok(saved)
            }
            Err(err) => {
                self.metrics
                    .record_db_operation(DbOperation::Insert, DbStatus::Error, None)?;
                tracing::warn!(error = %err, request_id = %event.request_id, "event not persisted");
                Err(err)
            }
        }
    }

    /// Draws one event from the source and ingests it.
    ///
    /// # Errors
    ///
    /// See [`IngestionPipeline::ingest`].
    pub async fn ingest_generated(&self) -> Result<PersistedEvent, TrackerError> {
        self.ingest(self.source.produce()).await
    }

    /// Generates and ingests `count` events one after another.
    ///
    /// Stops at the first failure. Events persisted before it stay
    /// persisted but are not returned.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::InvalidArgument`] for `count < 1`, otherwise
    /// the first error from [`IngestionPipeline::ingest`].
    pub async fn ingest_bulk(&self, count: i64) -> Result<Vec<PersistedEvent>, TrackerError> {
        if count < 1 {
            return Err(TrackerError::InvalidArgument(format!(
                "count must be a positive integer, got {count}"
            )));
        }

        let capacity = usize::try_from(count).map_or(BULK_PREALLOC_CAP, |c| c.min(BULK_PREALLOC_CAP));
        let mut saved = Vec::with_capacity(capacity);
        for _ in 0..count {
            match self.ingest_generated().await {
                Ok(entry) => saved.push(entry),
                Err(err) => {
                    tracing::warn!(requested = count, persisted = saved.len(), "bulk ingestion aborted");
                    return Err(err);
                }
            }
        }
        tracing::info!(count, "bulk ingestion complete");
        Ok(saved)
    }
}
