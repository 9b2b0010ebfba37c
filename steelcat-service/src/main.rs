//! Steelcat Entry Point
//!
//! Loads configuration, initializes tracing, warms the cache over an
//! in-memory store and runs until Ctrl-C.

use std::sync::Arc;

use steelcat_core::{CatalogError, CatalogResult};
use steelcat_service::{bootstrap, init_tracing, spawn_refresh, ServiceConfig};
use steelcat_storage::InMemoryRecordStore;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> CatalogResult<()> {
    let config = ServiceConfig::from_env();
    init_tracing(&config.telemetry)?;

    let store = Arc::new(InMemoryRecordStore::new());
    let state = bootstrap(store, &config).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresh = spawn_refresh(&state, shutdown_rx);

    tracing::info!(
        service_name = config.telemetry.service_name,
        refresh_interval = ?config.cache.refresh_interval,
        "Steelcat started"
    );

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| CatalogError::unavailable(format!("Failed to listen for Ctrl-C: {}", e)))?;
    tracing::info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    if let Some(handle) = refresh {
        match handle.await {
            Ok(metrics) => {
                let snapshot = metrics.snapshot();
                tracing::info!(
                    reloads = snapshot.reloads,
                    failures = snapshot.failures,
                    "Refresh task stopped"
                );
            }
            Err(e) => tracing::warn!(error = %e, "Refresh task ended abnormally"),
        }
    }

    let status = state.cache.status().await;
    tracing::info!(
        record_count = status.record_count,
        uptime_secs = state.uptime().as_secs(),
        "Steelcat stopped"
    );
    Ok(())
}
