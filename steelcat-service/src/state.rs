//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use steelcat_core::Timestamp;
use steelcat_storage::{ConsistencyCache, RecordStore};

use crate::config::ServiceConfig;

/// State handed to every request handler.
///
/// The cache is the only path handlers use for catalog access; the store is
/// reachable through [`ConsistencyCache::store`] for diagnostics.
pub struct AppState<S: RecordStore> {
    pub cache: Arc<ConsistencyCache<S>>,
    pub config: ServiceConfig,
    pub started_at: Timestamp,
}

impl<S: RecordStore> AppState<S> {
    pub fn new(cache: Arc<ConsistencyCache<S>>, config: ServiceConfig) -> Self {
        Self {
            cache,
            config,
            started_at: Utc::now(),
        }
    }

    /// Time since the state was created.
    pub fn uptime(&self) -> Duration {
        (Utc::now() - self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

impl<S: RecordStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            config: self.config.clone(),
            started_at: self.started_at,
        }
    }
}
