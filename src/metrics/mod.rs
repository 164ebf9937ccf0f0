//! Metrics: the process-wide registry and the service's instruments.
//!
//! [`MetricsRegistry`] is generic: counters, gauges, and fixed-bucket
//! histograms keyed by name and label values, rendered in the Prometheus
//! text format. [`AppMetrics`] registers the instruments this service
//! exposes and offers one recording method per concern.

pub mod histogram;
pub mod instruments;
pub mod registry;

pub use histogram::{DB_QUERY_BUCKETS, HistogramSeries};
pub use instruments::{AppMetrics, DbOperation, DbStatus};
pub use registry::{EXPOSITION_CONTENT_TYPE, InstrumentKind, MetricsRegistry};
