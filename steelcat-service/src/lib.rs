//! Steelcat Service - Process Wiring
//!
//! Configuration, tracing, shared state and startup for a process that serves
//! the steel catalog through a [`ConsistencyCache`](steelcat_storage::ConsistencyCache).
//! Transport layers build on [`AppState`].

pub mod bootstrap;
pub mod config;
pub mod jobs;
pub mod state;
pub mod telemetry;

pub use bootstrap::{bootstrap, spawn_refresh};
pub use config::ServiceConfig;
pub use jobs::{cache_refresh_task, CacheRefreshMetrics, CacheRefreshSnapshot};
pub use state::AppState;
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig, DEFAULT_LOG_FILTER};
