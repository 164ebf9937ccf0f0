//! Domain layer: events, aggregates, pool snapshots, and event sources.
//!
//! These are plain value types. Nothing here holds a reference to the
//! metrics registry or the connection pool.

pub mod event;
pub mod event_source;
pub mod pool_state;

pub use event::{AggregatedStat, Event, EventMetrics, LogLevel, PersistedEvent};
pub use event_source::{EventSource, RandomEventSource, SeededEventSource};
pub use pool_state::PoolState;
