//! Steelcat Storage - Record Store Trait and Consistency Cache
//!
//! Defines the [`RecordStore`] abstraction the rest of the system persists
//! through, an in-memory implementation, and the [`ConsistencyCache`] that
//! mirrors a store in memory.

pub mod cache;
pub mod in_memory;
pub mod store;

pub use cache::{
    CacheConfig, CacheStatus, CoherenceViolation, ConsistencyCache, ReloadReport, Served,
};
pub use in_memory::InMemoryRecordStore;
pub use store::{RecordStore, StorePage, StoreQuery};

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
