//! Service layer: orchestration between metrics and storage.
//!
//! [`IngestionPipeline`] sequences metric recording before persistence,
//! [`AggregationQueryService`] wraps the read side, and
//! [`HealthCheckService`] turns pool probes into a verdict.

pub mod health;
pub mod ingestion;
pub mod query;

pub use health::{HealthCheckService, HealthReport, HealthStatus};
pub use ingestion::IngestionPipeline;
pub use query::AggregationQueryService;
