//! In-process implementation of the persistence layer.
//!
//! [`MemoryStore`] honours the same contract as the PostgreSQL gateway:
//! it assigns ids and creation times, serves the aggregated view, and
//! refuses work once shut down. It can also be told to act unreachable or
//! to fail a specific insert, which is how the services' error paths are
//! exercised without a database.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{LogStore, validate_limit};
use crate::domain::{AggregatedStat, Event, PersistedEvent, PoolState};
use crate::error::TrackerError;

/// Version string reported by [`MemoryStore::pool_health`].
pub const MEMORY_STORE_VERSION: &str = concat!("log-tracker memory store ", env!("CARGO_PKG_VERSION"));

/// [`LogStore`] that keeps rows in a `Vec` behind a Tokio `RwLock`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<PersistedEvent>>,
    inserts_attempted: AtomicU64,
    /// 1-based index of the insert attempt that should fail, 0 for none.
    fail_insert_at: AtomicU64,
    unreachable: AtomicBool,
    closed: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty, reachable store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the `attempt`-th insert (counting from 1, across the store's
    /// lifetime) fail with [`TrackerError::Persistence`].
    #[must_use]
    pub fn failing_insert_at(self, attempt: u64) -> Self {
        self.fail_insert_at.store(attempt, Ordering::Relaxed);
        self
    }

    /// Simulates losing (`false`) or regaining (`true`) connectivity.
    pub fn set_reachable(&self, reachable: bool) {
        self.unreachable.store(!reachable, Ordering::Relaxed);
    }

    /// Number of stored rows.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Returns `true` if nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    fn check_available(&self) -> Result<(), TrackerError> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(TrackerError::PoolClosed);
        }
        if self.unreachable.load(Ordering::Relaxed) {
            return Err(TrackerError::Persistence(
                "connection refused: memory store marked unreachable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl LogStore for MemoryStore {
    async fn insert_event(&self, event: &Event) -> Result<PersistedEvent, TrackerError> {
        self.check_available()?;
        let attempt = self.inserts_attempted.fetch_add(1, Ordering::Relaxed) + 1;
        if attempt == self.fail_insert_at.load(Ordering::Relaxed) {
            return Err(TrackerError::Persistence(format!(
                "insert attempt {attempt} rejected"
            )));
        }

        let mut rows = self.rows.write().await;
        let id = rows.last().map_or(1, |r| r.id + 1);
        let saved = PersistedEvent {
            id,
            event: event.clone(),
            saved_at: Utc::now(),
        };
        rows.push(saved.clone());
        Ok(saved)
    }

    async fn list_recent_events(&self, limit: i64) -> Result<Vec<PersistedEvent>, TrackerError> {
        validate_limit(limit)?;
        self.check_available()?;
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        let rows = self.rows.read().await;
        Ok(rows.iter().rev().take(take).cloned().collect())
    }

    async fn fetch_aggregated_stats(&self) -> Result<Vec<AggregatedStat>, TrackerError> {
        self.check_available()?;
        let rows = self.rows.read().await;

        // (count, response, cpu, memory) sums per (service, level)
        let mut groups: BTreeMap<(String, String), (i64, f64, f64, f64)> = BTreeMap::new();
        for row in rows.iter() {
            let key = (row.event.service.clone(), row.event.level.as_str().to_string());
            let entry = groups.entry(key).or_insert((0, 0.0, 0.0, 0.0));
            entry.0 += 1;
            entry.1 += row.event.metrics.response_time_ms;
            entry.2 += row.event.metrics.cpu_usage_percent;
            entry.3 += row.event.metrics.memory_usage_mb;
        }

        #[allow(clippy::cast_precision_loss)]
        let stats: Vec<AggregatedStat> = groups
            .into_iter()
            .map(|((service, level), (count, rt, cpu, mem))| {
                let n = count as f64;
                AggregatedStat {
                    service,
                    level,
                    count,
                    avg_response_time: rt / n,
                    avg_cpu_usage: cpu / n,
                    avg_memory_usage: mem / n,
                }
            })
            .collect();
        Ok(stats)
    }

    async fn pool_health(&self) -> PoolState {
        match self.check_available() {
            Ok(()) => PoolState::Connected {
                total_connections: 1,
                idle_connections: 1,
                waiting_connections: 0,
                current_time: Utc::now(),
                version: MEMORY_STORE_VERSION.to_string(),
            },
            Err(err) => PoolState::Error {
                error: err.to_string(),
            },
        }
    }

    async fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::Relaxed) {
            tracing::info!("memory store closed");
        }
    }
}
