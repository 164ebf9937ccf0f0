//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventSource;
use crate::error::TrackerError;
use crate::metrics::{AppMetrics, MetricsRegistry};
use crate::persistence::LogStore;
use crate::service::{AggregationQueryService, HealthCheckService, IngestionPipeline};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Event ingestion.
    pub ingestion: Arc<IngestionPipeline>,
    /// Read-side queries.
    pub queries: Arc<AggregationQueryService>,
    /// Storage health probe.
    pub health: Arc<HealthCheckService>,
    /// Instruments and the registry they live in.
    pub metrics: AppMetrics,
}

impl AppState {
    /// Wires the services around one registry, store, and event source.
    ///
    /// The caller keeps its own handle on `store` to shut it down.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::DuplicateInstrument`] if `registry` already
    /// holds the service instruments.
    pub fn build(
        registry: Arc<MetricsRegistry>,
        store: Arc<dyn LogStore>,
        source: Arc<dyn EventSource>,
    ) -> Result<Self, TrackerError> {
        let metrics = AppMetrics::register(registry)?;
        Ok(Self {
            ingestion: Arc::new(IngestionPipeline::new(
                metrics.clone(),
                Arc::clone(&store),
                source,
            )),
            queries: Arc::new(AggregationQueryService::new(
                metrics.clone(),
                Arc::clone(&store),
            )),
            health: Arc::new(HealthCheckService::new(store)),
            metrics,
        })
    }
}
