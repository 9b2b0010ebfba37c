//! Startup wiring: build the cache, warm it, start the refresh task.

use std::sync::Arc;

use steelcat_storage::{ConsistencyCache, RecordStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::ServiceConfig;
use crate::jobs::{cache_refresh_task, CacheRefreshMetrics};
use crate::state::AppState;

/// Build the application state over `store`.
///
/// Runs the warm load when configured. A failed warm load is logged and the
/// service starts in passthrough mode.
pub async fn bootstrap<S: RecordStore>(store: Arc<S>, config: &ServiceConfig) -> AppState<S> {
    let cache = Arc::new(ConsistencyCache::new(store, config.cache.clone()));

    if cache.config().warm_on_start {
        match cache.reload().await {
            Ok(report) => tracing::info!(
                record_count = report.record_count,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "Cache warmed"
            ),
            Err(e) => tracing::warn!(
                error = %e,
                "Cache warm load failed; serving reads from the store"
            ),
        }
    } else {
        tracing::info!("Cache warm load disabled; serving reads from the store");
    }

    AppState::new(cache, config.clone())
}

/// Spawn the periodic refresh task if the cache has a refresh interval.
pub fn spawn_refresh<S: RecordStore + 'static>(
    state: &AppState<S>,
    shutdown_rx: watch::Receiver<bool>,
) -> Option<JoinHandle<Arc<CacheRefreshMetrics>>> {
    let period = state.cache.config().refresh_interval?;
    Some(tokio::spawn(cache_refresh_task(
        Arc::clone(&state.cache),
        period,
        shutdown_rx,
    )))
}
