//! log-tracker server entry point.
//!
//! Wires the metrics registry, storage, and services, then serves the HTTP
//! API until SIGINT or SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use log_tracker::api;
use log_tracker::app_state::AppState;
use log_tracker::config::{LogFormat, StorageBackend, TrackerConfig};
use log_tracker::domain::{EventSource, RandomEventSource, SeededEventSource};
use log_tracker::metrics::MetricsRegistry;
use log_tracker::persistence::{LogStore, MemoryStore, PostgresGateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = TrackerConfig::from_env().context("loading configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }

    tracing::info!(addr = %config.listen_addr, backend = ?config.storage_backend, "starting log-tracker");

    // Storage
    let store: Arc<dyn LogStore> = match config.storage_backend {
        StorageBackend::Postgres => {
            let options = config.database.connect_options()?;
            Arc::new(PostgresGateway::connect_lazy(options))
        }
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };

    let source: Arc<dyn EventSource> = match config.event_seed {
        Some(seed) => Arc::new(SeededEventSource::new(seed)),
        None => Arc::new(RandomEventSource::new()),
    };

    // Build application state
    let registry = Arc::new(MetricsRegistry::new());
    let app_state = AppState::build(registry, Arc::clone(&store), source)?;

    let probe = app_state.health.pool_state().await;
    match probe.error_message() {
        None => tracing::info!("storage reachable"),
        Some(error) => tracing::warn!(%error, "storage unreachable at startup; serving anyway"),
    }

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, api::app(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("draining connection pool");
    store.shutdown().await;
    tracing::info!("shutdown complete");

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = signal_or_pending("ctrl-c", tokio::signal::ctrl_c());

    #[cfg(unix)]
    let terminate = signal_or_pending("SIGTERM", async {
        let mut signal =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        signal.recv().await;
        Ok::<(), std::io::Error>(())
    });

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received ctrl-c"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}

/// Waits for `signal`. A listener that cannot be installed never fires.
async fn signal_or_pending(name: &str, signal: impl Future<Output = std::io::Result<()>>) {
    if let Err(e) = signal.await {
        tracing::error!(error = %e, signal = name, "failed to listen for signal");
        std::future::pending::<()>().await;
    }
}
