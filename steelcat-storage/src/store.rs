//! Record store abstraction.
//!
//! The cache talks to persistence only through [`RecordStore`]. Implementations
//! own id assignment and are expected to enforce spec uniqueness themselves;
//! the cache checks it too, but a store-side race surfaces as
//! [`StoreError::Conflict`](steelcat_core::StoreError::Conflict).

use async_trait::async_trait;
use steelcat_core::{
    BulkSelector, CatalogResult, NewRecord, Record, RecordChanges, RecordFilter, RecordId,
    RecordKey, RecordQuery, SortSpec,
};

/// Store-native form of a query: filter, optional sort, offset and limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreQuery {
    pub filter: RecordFilter,
    pub sort: Option<SortSpec>,
    pub offset: usize,
    /// `None` means unbounded
    pub limit: Option<usize>,
}

impl StoreQuery {
    /// Every record in the store's natural order.
    pub fn scan() -> Self {
        Self::default()
    }
}

impl From<&RecordQuery> for StoreQuery {
    fn from(query: &RecordQuery) -> Self {
        let (offset, limit) = query.page.offset_limit();
        Self {
            filter: query.filter.clone(),
            sort: query.sort,
            offset,
            limit,
        }
    }
}

/// Result of [`RecordStore::find_many`].
#[derive(Debug, Clone, PartialEq)]
pub struct StorePage {
    pub records: Vec<Record>,
    /// Matches across the whole store, ignoring offset and limit
    pub total_count: usize,
}

/// Persistent record store.
///
/// All methods are fallible with
/// [`StoreError::Unavailable`](steelcat_core::StoreError::Unavailable) on I/O
/// failure. A failed call must leave the store unchanged.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up a single record by id or spec.
    async fn find_one(&self, key: &RecordKey) -> CatalogResult<Option<Record>>;

    /// Filter, sort and slice. Unsorted results follow the store's natural order.
    async fn find_many(&self, query: &StoreQuery) -> CatalogResult<StorePage>;

    /// Persist a new record and return it with its assigned id.
    async fn insert(&self, candidate: &NewRecord) -> CatalogResult<Record>;

    /// Apply changes to the record with `id` and return the post-update state.
    ///
    /// Fails with `NotFound` if no such record exists.
    async fn update(&self, id: RecordId, changes: &RecordChanges) -> CatalogResult<Record>;

    /// Remove one record and return it. Fails with `NotFound` if absent.
    async fn delete_one(&self, key: &RecordKey) -> CatalogResult<Record>;

    /// Remove every record addressed by `selector` and return how many were removed.
    async fn delete_many(&self, selector: &BulkSelector) -> CatalogResult<u64>;
}
