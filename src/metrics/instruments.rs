//! The service's own instruments and typed recording helpers.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::histogram::DB_QUERY_BUCKETS;
use super::registry::{InstrumentKind, MetricsRegistry};
use crate::domain::{Event, LogLevel, PoolState};
use crate::error::TrackerError;

/// Generated events by level and service.
pub const LOG_COUNT_TOTAL: &str = "log_count_total";
/// Last observed response time per service.
pub const RESPONSE_TIME_MS: &str = "response_time_ms";
/// Last observed CPU usage per service.
pub const CPU_USAGE_PERCENT: &str = "cpu_usage_percent";
/// Last observed memory usage per service.
pub const MEMORY_USAGE_MB: &str = "memory_usage_mb";
/// Pool connection counts by status (`total`, `idle`, `waiting`).
pub const DB_CONNECTIONS_TOTAL: &str = "db_connections_total";
/// Database operations by operation and outcome.
pub const DB_OPERATIONS_TOTAL: &str = "db_operations_total";
/// Database operation latency by operation.
pub const DB_QUERY_DURATION_SECONDS: &str = "db_query_duration_seconds";
/// Events durably saved, by level and service.
pub const DB_LOGS_SAVED_TOTAL: &str = "db_logs_saved_total";
/// Process start time as a Unix timestamp.
pub const PROCESS_START_TIME_SECONDS: &str = "process_start_time_seconds";

/// Database operation recorded in [`DB_OPERATIONS_TOTAL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbOperation {
    /// Row insert.
    Insert,
    /// Read query.
    Select,
}

impl DbOperation {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Select => "select",
        }
    }
}

/// Outcome recorded in [`DB_OPERATIONS_TOTAL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbStatus {
    /// The operation completed.
    Success,
    /// The operation failed.
    Error,
}

impl DbStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Handle to the registry with every service instrument registered.
///
/// Cheap to clone; all clones record into the same registry.
#[derive(Debug, Clone)]
pub struct AppMetrics {
    registry: Arc<MetricsRegistry>,
}

impl AppMetrics {
    /// Registers all service instruments in `registry`.
    ///
    /// Call once per registry: instruments may only be registered once.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::DuplicateInstrument`] if `registry` already
    /// holds any of the instruments.
    pub fn register(registry: Arc<MetricsRegistry>) -> Result<Self, TrackerError> {
        use InstrumentKind::{Counter, Gauge};

        registry.register_instrument(
            Counter,
            LOG_COUNT_TOTAL,
            "Total number of logs generated",
            &["level", "service"],
        )?;
        registry.register_instrument(Gauge, RESPONSE_TIME_MS, "Response time in ms", &["service"])?;
        registry.register_instrument(Gauge, CPU_USAGE_PERCENT, "CPU usage percentage", &["service"])?;
        registry.register_instrument(Gauge, MEMORY_USAGE_MB, "Memory usage in MB", &["service"])?;
        registry.register_instrument(
            Gauge,
            DB_CONNECTIONS_TOTAL,
            "Total database connections",
            &["status"],
        )?;
        registry.register_instrument(
            Counter,
            DB_OPERATIONS_TOTAL,
            "Total database operations",
            &["operation", "status"],
        )?;
        registry.register_instrument(
            InstrumentKind::Histogram {
                buckets: DB_QUERY_BUCKETS.to_vec(),
            },
            DB_QUERY_DURATION_SECONDS,
            "Duration of database queries in seconds",
            &["operation"],
        )?;
        registry.register_instrument(
            Counter,
            DB_LOGS_SAVED_TOTAL,
            "Total number of logs saved to database",
            &["level", "service"],
        )?;
        registry.register_instrument(
            Gauge,
            PROCESS_START_TIME_SECONDS,
            "Start time of the process since unix epoch in seconds",
            &[],
        )?;

        #[allow(clippy::cast_precision_loss)]
        let started = Utc::now().timestamp_millis() as f64 / 1000.0;
        registry.set_gauge(PROCESS_START_TIME_SECONDS, &[], started)?;

        Ok(Self { registry })
    }

    /// The underlying registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<MetricsRegistry> {
        &self.registry
    }

    /// Counts a generated event and overwrites its service's gauges.
    ///
    /// # Errors
    ///
    /// Propagates registry misuse errors.
    pub fn record_event(&self, event: &Event) -> Result<(), TrackerError> {
        let service = event.service.as_str();
        self.registry.increment_counter(
            LOG_COUNT_TOTAL,
            &[("level", event.level.as_str()), ("service", service)],
            1.0,
        )?;
        let labels = [("service", service)];
        self.registry
            .set_gauge(RESPONSE_TIME_MS, &labels, event.metrics.response_time_ms)?;
        self.registry
            .set_gauge(CPU_USAGE_PERCENT, &labels, event.metrics.cpu_usage_percent)?;
        self.registry
            .set_gauge(MEMORY_USAGE_MB, &labels, event.metrics.memory_usage_mb)?;
        Ok(())
    }

    /// Counts a database operation and, when given, observes its duration.
    ///
    /// # Errors
    ///
    /// Propagates registry misuse errors.
    pub fn record_db_operation(
        &self,
        operation: DbOperation,
        status: DbStatus,
        duration: Option<Duration>,
    ) -> Result<(), TrackerError> {
        self.registry.increment_counter(
            DB_OPERATIONS_TOTAL,
            &[("operation", operation.as_str()), ("status", status.as_str())],
            1.0,
        )?;
        if let Some(duration) = duration {
            self.registry.observe_histogram(
                DB_QUERY_DURATION_SECONDS,
                &[("operation", operation.as_str())],
                duration.as_secs_f64(),
            )?;
        }
        Ok(())
    }

    /// Counts an event that reached storage.
    ///
    /// # Errors
    ///
    /// Propagates registry misuse errors.
    pub fn record_log_saved(&self, level: LogLevel, service: &str) -> Result<(), TrackerError> {
        self.registry.increment_counter(
            DB_LOGS_SAVED_TOTAL,
            &[("level", level.as_str()), ("service", service)],
            1.0,
        )
    }

    /// Copies pool counters into the connection gauges.
    ///
    /// Only a connected pool updates the gauges; after a failed health
    /// query they keep their last successful values.
    ///
    /// # Errors
    ///
    /// Propagates registry misuse errors.
    pub fn update_pool_gauges(&self, state: &PoolState) -> Result<(), TrackerError> {
        let PoolState::Connected {
            total_connections,
            idle_connections,
            waiting_connections,
            ..
        } = state
        else {
            return Ok(());
        };
        for (status, value) in [
            ("total", total_connections),
            ("idle", idle_connections),
            ("waiting", waiting_connections),
        ] {
            self.registry
                .set_gauge(DB_CONNECTIONS_TOTAL, &[("status", status)], f64::from(*value))?;
        }
        Ok(())
    }

    /// Renders the registry in the text exposition format.
    #[must_use]
    pub fn render(&self) -> String {
        self.registry.render_exposition()
    }
}
