//! Persistence layer: durable event storage and pool introspection.
//!
//! Provides the [`LogStore`] trait the services depend on. The production
//! implementation is [`PostgresGateway`], backed by a bounded
//! `sqlx::PgPool`; [`MemoryStore`] keeps everything in process.

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;

pub use memory::MemoryStore;
pub use postgres::PostgresGateway;

use crate::domain::{AggregatedStat, Event, PersistedEvent, PoolState};
use crate::error::TrackerError;

/// Default number of rows returned by [`LogStore::list_recent_events`].
pub const DEFAULT_RECENT_LIMIT: i64 = 50;

/// Durable storage for generated events.
///
/// Every method except [`LogStore::pool_health`] surfaces failures to the
/// caller; none of them retries.
#[async_trait]
pub trait LogStore: Send + Sync + fmt::Debug {
    /// Persists one event, returning it with its storage-assigned id and
    /// creation time.
    ///
    /// # Errors
    ///
    /// [`TrackerError::ConnectionTimeout`], [`TrackerError::PoolClosed`], or
    /// [`TrackerError::Persistence`].
    async fn insert_event(&self, event: &Event) -> Result<PersistedEvent, TrackerError>;

    /// Returns at most `limit` events, newest first.
    ///
    /// # Errors
    ///
    /// [`TrackerError::InvalidArgument`] for `limit < 1`, otherwise the
    /// storage errors of [`LogStore::insert_event`].
    async fn list_recent_events(&self, limit: i64) -> Result<Vec<PersistedEvent>, TrackerError>;

    /// Reads the pre-aggregated per-`(service, level)` statistics, ordered
    /// by service then level.
    ///
    /// # Errors
    ///
    /// The storage errors of [`LogStore::insert_event`].
    async fn fetch_aggregated_stats(&self) -> Result<Vec<AggregatedStat>, TrackerError>;

    /// Runs a trivial round-trip query and reports pool counters.
    ///
    /// Never fails: connectivity problems become [`PoolState::Error`].
    async fn pool_health(&self) -> PoolState;

    /// Releases every pooled connection. Idempotent; afterwards every
    /// operation fails with [`TrackerError::PoolClosed`].
    async fn shutdown(&self);
}

/// Rejects non-positive limits.
pub(crate) fn validate_limit(limit: i64) -> Result<(), TrackerError> {
    if limit < 1 {
        return Err(TrackerError::InvalidArgument(format!(
            "limit must be a positive integer, got {limit}"
        )));
    }
    Ok(())
}
