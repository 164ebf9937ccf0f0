//! # log-tracker
//!
//! Synthetic log-event ingestion service with Prometheus metrics and
//! PostgreSQL persistence.
//!
//! Each request draws a synthetic log event, records it in an in-process
//! metrics registry, and persists it through a bounded connection pool.
//! Read endpoints return recent events and per-service aggregates; the
//! scrape endpoint exposes every instrument, including pool occupancy.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, Prometheus scraper)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── IngestionPipeline / AggregationQueryService /
//!     │   HealthCheckService (service/)
//!     │
//!     ├── MetricsRegistry + AppMetrics (metrics/)
//!     ├── EventSource (domain/)
//!     │
//!     └── LogStore (persistence/)
//!         ├── PostgresGateway (sqlx::PgPool, 20 connections)
//!         └── MemoryStore
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod persistence;
pub mod service;
