//! In-memory record store.
//!
//! Keeps records in insertion order, which is the store's natural order for
//! unsorted scans. Spec uniqueness is enforced and violations are reported as
//! [`StoreError::Conflict`](steelcat_core::StoreError::Conflict).

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use steelcat_core::{
    BulkSelector, CatalogError, CatalogResult, NewRecord, Record, RecordChanges, RecordId,
    RecordKey,
};

use crate::store::{RecordStore, StorePage, StoreQuery};

/// Record store backed by a shared `Vec`. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    records: Arc<RwLock<Vec<Record>>>,
}

impl InMemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `records`, kept in the given order.
    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Write a fully-formed record directly, bypassing any cache in front of
    /// this store. Replaces an existing record with the same id.
    pub fn put(&self, record: Record) -> CatalogResult<()> {
        let mut records = self.write()?;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(slot) => *slot = record,
            None => records.push(record),
        }
        Ok(())
    }

    /// Copy of every record in natural order.
    pub fn records(&self) -> CatalogResult<Vec<Record>> {
        Ok(self.read()?.clone())
    }

    /// Number of stored records.
    pub fn len(&self) -> CatalogResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> CatalogResult<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> CatalogResult<RwLockReadGuard<'_, Vec<Record>>> {
        self.records
            .read()
            .map_err(|_| CatalogError::unavailable("record store lock poisoned"))
    }

    fn write(&self) -> CatalogResult<RwLockWriteGuard<'_, Vec<Record>>> {
        self.records
            .write()
            .map_err(|_| CatalogError::unavailable("record store lock poisoned"))
    }
}

fn position(records: &[Record], key: &RecordKey) -> Option<usize> {
    match key {
        RecordKey::Id(id) => records.iter().position(|r| r.id == *id),
        RecordKey::Spec(spec) => records.iter().position(|r| r.spec == *spec),
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find_one(&self, key: &RecordKey) -> CatalogResult<Option<Record>> {
        let records = self.read()?;
        Ok(position(&records, key).map(|i| records[i].clone()))
    }

    async fn find_many(&self, query: &StoreQuery) -> CatalogResult<StorePage> {
        let records = self.read()?;
        let filter = query.filter.compile();
        let mut matched: Vec<&Record> = records.iter().filter(|r| filter.matches(r)).collect();
        if let Some(sort) = &query.sort {
            sort.apply(&mut matched);
        }

        let total_count = matched.len();
        let page = matched
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok(StorePage {
            records: page,
            total_count,
        })
    }

    async fn insert(&self, candidate: &NewRecord) -> CatalogResult<Record> {
        let mut records = self.write()?;
        if records.iter().any(|r| r.spec == candidate.spec) {
            return Err(CatalogError::conflict(format!(
                "spec {:?} already stored",
                candidate.spec
            )));
        }
        let record = Record::from_new(RecordId::now_v7(), candidate.clone());
        records.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: RecordId, changes: &RecordChanges) -> CatalogResult<Record> {
        let mut records = self.write()?;
        let index = position(&records, &RecordKey::Id(id))
            .ok_or_else(|| CatalogError::not_found(id.to_string()))?;

        if let Some(spec) = &changes.spec {
            if records.iter().any(|r| r.id != id && r.spec == *spec) {
                return Err(CatalogError::conflict(format!("spec {:?} already stored", spec)));
            }
        }

        let updated = records[index].with_changes(changes);
        records[index] = updated.clone();
        Ok(updated)
    }

    async fn delete_one(&self, key: &RecordKey) -> CatalogResult<Record> {
        let mut records = self.write()?;
        let index =
            position(&records, key).ok_or_else(|| CatalogError::not_found(key.to_string()))?;
        Ok(records.remove(index))
    }

    async fn delete_many(&self, selector: &BulkSelector) -> CatalogResult<u64> {
        let mut records = self.write()?;
        let before = records.len();
        records.retain(|r| !selector.selects(r));
        Ok((before - records.len()) as u64)
    }
}
