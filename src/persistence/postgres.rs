//! PostgreSQL implementation of the persistence layer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres};

use super::models::{LogRow, LogStatsRow};
use super::{LogStore, validate_limit};
use crate::domain::{AggregatedStat, Event, PersistedEvent, PoolState};
use crate::error::TrackerError;

/// Upper bound on concurrently open connections.
pub const MAX_CONNECTIONS: u32 = 20;
/// Idle connections are closed after this long.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30);
/// Acquiring a connection fails with [`TrackerError::ConnectionTimeout`]
/// after this long.
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(2);

const INSERT_LOG: &str = "INSERT INTO logs \
     (timestamp, level, service, message, request_id, response_time, cpu_usage, memory_usage) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
     RETURNING id, created_at";

const SELECT_RECENT: &str = "SELECT id, timestamp, level, service, message, request_id, \
     response_time, cpu_usage, memory_usage, created_at \
     FROM logs ORDER BY created_at DESC, id DESC LIMIT $1";

const SELECT_STATS: &str = "SELECT service, level, count, avg_response_time, avg_cpu_usage, avg_memory_usage \
     FROM log_stats ORDER BY service, level";

const SELECT_PING: &str = "SELECT NOW(), version()";

/// PostgreSQL-backed [`LogStore`] using a bounded `sqlx::PgPool`.
///
/// Every operation checks a connection out through [`PostgresGateway::acquire`]
/// and hands it back when the returned guard drops, whether the query
/// succeeded or not.
#[derive(Debug, Clone)]
pub struct PostgresGateway {
    pool: PgPool,
    waiting: Arc<AtomicU32>,
}

impl PostgresGateway {
    /// Wraps an existing pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            waiting: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Builds the gateway's pool without opening any connection yet.
    ///
    /// Sizing is fixed: [`MAX_CONNECTIONS`], [`IDLE_TIMEOUT`], and
    /// [`ACQUIRE_TIMEOUT`]. Must be called inside a Tokio runtime.
    #[must_use]
    pub fn connect_lazy(options: PgConnectOptions) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .min_connections(0)
            .idle_timeout(IDLE_TIMEOUT)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy_with(options);
        Self::new(pool)
    }

    /// The underlying pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Callers currently blocked in [`PostgresGateway::acquire`].
    ///
    /// A caller that finds an idle connection is never counted; one that
    /// has to wait for a release or for a new connection to open is counted
    /// until it gets one or gives up.
    #[must_use]
    pub fn waiting(&self) -> u32 {
        self.waiting.load(Ordering::Relaxed)
    }

    /// Checks a connection out of the pool.
    ///
    /// The connection goes back to the pool when the returned value drops.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::ConnectionTimeout`] if none frees up within
    /// [`ACQUIRE_TIMEOUT`], [`TrackerError::PoolClosed`] after
    /// [`LogStore::shutdown`], or [`TrackerError::Persistence`] if a new
    /// connection cannot be opened.
    pub async fn acquire(&self) -> Result<PoolConnection<Postgres>, TrackerError> {
        if let Some(conn) = self.pool.try_acquire() {
            return Ok(conn);
        }
        let _waiting = WaitGuard::enter(&self.waiting);
        Ok(self.pool.acquire().await?)
    }

    async fn ping(&self) -> Result<(DateTime<Utc>, String), TrackerError> {
        let mut conn = self.acquire().await?;
        let row = sqlx::query_as::<_, (DateTime<Utc>, String)>(SELECT_PING)
            .fetch_one(&mut *conn)
            .await?;
        Ok(row)
    }
}

#[async_trait]
impl LogStore for PostgresGateway {
    async fn insert_event(&self, event: &Event) -> Result<PersistedEvent, TrackerError> {
        let mut conn = self.acquire().await?;
        let (id, created_at) = sqlx::query_as::<_, (i64, DateTime<Utc>)>(INSERT_LOG)
            .bind(event.timestamp)
            .bind(event.level.as_str())
            .bind(&event.service)
            .bind(&event.message)
            .bind(&event.request_id)
            .bind(event.metrics.response_time_ms)
            .bind(event.metrics.cpu_usage_percent)
            .bind(event.metrics.memory_usage_mb)
            .fetch_one(&mut *conn)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "error saving log entry"))?;

        tracing::debug!(id, service = %event.service, level = %event.level, "log entry saved");
        Ok(PersistedEvent {
            id,
            event: event.clone(),
            saved_at: created_at,
        })
    }

    async fn list_recent_events(&self, limit: i64) -> Result<Vec<PersistedEvent>, TrackerError> {
        validate_limit(limit)?;
        let mut conn = self.acquire().await?;
        let rows = sqlx::query_as::<_, LogRow>(SELECT_RECENT)
            .bind(limit)
            .fetch_all(&mut *conn)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "error fetching recent logs"))?;

        rows.into_iter().map(PersistedEvent::try_from).collect()
    }

    async fn fetch_aggregated_stats(&self) -> Result<Vec<AggregatedStat>, TrackerError> {
        let mut conn = self.acquire().await?;
        let rows = sqlx::query_as::<_, LogStatsRow>(SELECT_STATS)
            .fetch_all(&mut *conn)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "error fetching log stats"))?;

        Ok(rows.into_iter().map(AggregatedStat::from).collect())
    }

    async fn pool_health(&self) -> PoolState {
        match self.ping().await {
            Ok((current_time, version)) => PoolState::Connected {
                total_connections: self.pool.size(),
                idle_connections: u32::try_from(self.pool.num_idle()).unwrap_or(u32::MAX),
                waiting_connections: self.waiting(),
                current_time,
                version,
            },
            Err(err) => {
                tracing::warn!(error = %err, "database health probe failed");
                PoolState::Error {
                    error: err.to_string(),
                }
            }
        }
    }

    async fn shutdown(&self) {
        if self.pool.is_closed() {
            return;
        }
        self.pool.close().await;
        tracing::info!("database connection pool closed");
    }
}

/// Counts a caller as waiting for as long as the guard lives. Entered
/// only after the pool had no idle connection to hand out.
#[derive(Debug)]
struct WaitGuard<'a>(&'a AtomicU32);

impl<'a> WaitGuard<'a> {
    fn enter(counter: &'a AtomicU32) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for WaitGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}
