//! Background Jobs
//!
//! - `cache_refresh`: periodic full reload of the consistency cache
//!
//! # Usage
//!
//! ```ignore
//! use steelcat_service::jobs::cache_refresh_task;
//! use tokio::sync::watch;
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! tokio::spawn(cache_refresh_task(Arc::clone(&cache), period, shutdown_rx));
//!
//! // On shutdown
//! let _ = shutdown_tx.send(true);
//! ```

pub mod cache_refresh;

pub use cache_refresh::{cache_refresh_task, CacheRefreshMetrics, CacheRefreshSnapshot};
