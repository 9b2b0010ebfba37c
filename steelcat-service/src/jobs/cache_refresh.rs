//! Cache Refresh Background Task
//!
//! Periodically rebuilds the consistency cache from a full store scan. The
//! cache is kept current by its own write path, so this only picks up
//! changes made to the store by other writers.
//!
//! A failed reload is logged and counted; the cache keeps serving its
//! previous snapshot (or stays in passthrough mode) until the next tick.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use steelcat_storage::{ConsistencyCache, RecordStore};
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

// ============================================================================
// METRICS
// ============================================================================

/// Counters for the refresh task.
#[derive(Debug, Default)]
pub struct CacheRefreshMetrics {
    /// Successful reloads since startup
    pub reloads: AtomicU64,

    /// Failed reloads since startup
    pub failures: AtomicU64,
}

impl CacheRefreshMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current snapshot of all metrics.
    pub fn snapshot(&self) -> CacheRefreshSnapshot {
        CacheRefreshSnapshot {
            reloads: self.reloads.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of refresh metrics at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheRefreshSnapshot {
    pub reloads: u64,
    pub failures: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Reload `cache` every `period` until `shutdown_rx` reads `true`.
///
/// The first reload happens one full period after start; the warm load at
/// startup covers time zero.
///
/// # Example
///
/// ```ignore
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// let handle = tokio::spawn(cache_refresh_task(cache, Duration::from_secs(300), shutdown_rx));
///
/// let _ = shutdown_tx.send(true);
/// let metrics = handle.await?;
/// ```
pub async fn cache_refresh_task<S: RecordStore>(
    cache: Arc<ConsistencyCache<S>>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<CacheRefreshMetrics> {
    let metrics = Arc::new(CacheRefreshMetrics::new());

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        interval_secs = period.as_secs(),
        "Cache refresh task started"
    );

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                // A dropped sender also ends the task.
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::info!("Cache refresh task shutting down");
                    break;
                }
            }

            _ = ticker.tick() => {
                refresh_once(&cache, &metrics).await;
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        reloads = snapshot.reloads,
        failures = snapshot.failures,
        "Cache refresh task completed"
    );

    metrics
}

async fn refresh_once<S: RecordStore>(cache: &ConsistencyCache<S>, metrics: &CacheRefreshMetrics) {
    match cache.reload().await {
        Ok(report) => {
            metrics.reloads.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(record_count = report.record_count, "Periodic cache reload completed");
        }
        Err(e) => {
            metrics.failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(error = %e, "Periodic cache reload failed");
        }
    }
}
