//! Fault injection for record stores.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use steelcat_core::{
    BulkSelector, CatalogError, CatalogResult, NewRecord, Record, RecordChanges, RecordId,
    RecordKey,
};
use steelcat_storage::{RecordStore, StorePage, StoreQuery};

/// The six store operations, for selecting which ones fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    FindOne,
    FindMany,
    Insert,
    Update,
    DeleteOne,
    DeleteMany,
}

impl StoreOp {
    pub const ALL: [StoreOp; 6] = [
        StoreOp::FindOne,
        StoreOp::FindMany,
        StoreOp::Insert,
        StoreOp::Update,
        StoreOp::DeleteOne,
        StoreOp::DeleteMany,
    ];

    fn bit(self) -> u32 {
        1 << self as u32
    }
}

/// Wraps a store and fails selected operations with `StoreUnavailable`.
///
/// Failing calls never reach the inner store. Every call, failed or not, is
/// counted.
#[derive(Debug)]
pub struct FaultyStore<S> {
    inner: Arc<S>,
    faults: AtomicU32,
    calls: AtomicUsize,
}

impl<S: RecordStore> FaultyStore<S> {
    /// Wrap `inner` with no faults enabled.
    pub fn new(inner: Arc<S>) -> Self {
        Self {
            inner,
            faults: AtomicU32::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    /// Make `op` fail until healed.
    pub fn fail(&self, op: StoreOp) {
        self.faults.fetch_or(op.bit(), Ordering::SeqCst);
    }

    /// Make every operation fail.
    pub fn fail_all(&self) {
        for op in StoreOp::ALL {
            self.fail(op);
        }
    }

    pub fn heal(&self, op: StoreOp) {
        self.faults.fetch_and(!op.bit(), Ordering::SeqCst);
    }

    pub fn heal_all(&self) {
        self.faults.store(0, Ordering::SeqCst);
    }

    /// Number of calls made to this store so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self, op: StoreOp) -> CatalogResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.faults.load(Ordering::SeqCst) & op.bit() != 0 {
            return Err(CatalogError::unavailable(format!("injected fault on {:?}", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for FaultyStore<S> {
    async fn find_one(&self, key: &RecordKey) -> CatalogResult<Option<Record>> {
        self.check(StoreOp::FindOne)?;
        self.inner.find_one(key).await
    }

    async fn find_many(&self, query: &StoreQuery) -> CatalogResult<StorePage> {
        self.check(StoreOp::FindMany)?;
        self.inner.find_many(query).await
    }

    async fn insert(&self, candidate: &NewRecord) -> CatalogResult<Record> {
        self.check(StoreOp::Insert)?;
        self.inner.insert(candidate).await
    }

    async fn update(&self, id: RecordId, changes: &RecordChanges) -> CatalogResult<Record> {
        self.check(StoreOp::Update)?;
        self.inner.update(id, changes).await
    }

    async fn delete_one(&self, key: &RecordKey) -> CatalogResult<Record> {
        self.check(StoreOp::DeleteOne)?;
        self.inner.delete_one(key).await
    }

    async fn delete_many(&self, selector: &BulkSelector) -> CatalogResult<u64> {
        self.check(StoreOp::DeleteMany)?;
        self.inner.delete_many(selector).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use steelcat_core::ErrorKind;
    use steelcat_storage::InMemoryRecordStore;

    #[tokio::test]
    async fn test_fault_toggles_per_operation() {
        let store = FaultyStore::new(Arc::new(InMemoryRecordStore::new()));
        store.fail(StoreOp::Insert);

        let err = store.insert(&NewRecord::new("A", 1.0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        assert!(store.inner().is_empty().unwrap());
        assert!(store.find_many(&StoreQuery::scan()).await.is_ok());

        store.heal(StoreOp::Insert);
        assert!(store.insert(&NewRecord::new("A", 1.0)).await.is_ok());
        assert_eq!(store.calls(), 3);
    }

    #[tokio::test]
    async fn test_fail_all_and_heal_all() {
        let store = FaultyStore::new(Arc::new(InMemoryRecordStore::new()));
        store.fail_all();
        assert!(store.find_one(&RecordKey::Spec("A".into())).await.is_err());
        assert!(store
            .delete_many(&BulkSelector::Specs(vec!["A".into()]))
            .await
            .is_err());

        store.heal_all();
        assert!(store.find_one(&RecordKey::Spec("A".into())).await.is_ok());
    }
}
