//! Consistency cache: a full in-memory mirror of the record store.
//!
//! The cache keeps three views of the catalog in agreement at all times:
//! the ordered snapshot, an index by spec and an index by id. Reads carry a
//! [`Served`] annotation saying whether they were answered from the snapshot
//! or by the store.
//!
//! # Example
//!
//! ```ignore
//! let cache = ConsistencyCache::new(store, CacheConfig::from_env());
//! cache.reload().await?;
//!
//! let read = cache.get("SS400-10").await?;
//! if !read.was_cache_hit() {
//!     tracing::debug!("served by the store");
//! }
//! ```

pub mod config;
pub mod consistency;
pub mod served;
pub mod state;

pub use config::CacheConfig;
pub use consistency::ConsistencyCache;
pub use served::Served;
pub use state::{CacheStatus, CoherenceViolation, ReloadReport};
