//! Consistency cache over a [`RecordStore`].
//!
//! Holds the full catalog in memory with two secondary indexes. Reads are
//! answered from the snapshot once it is loaded and pass through to the store
//! otherwise. Writes always go to the store first and are applied to the
//! snapshot only after the store call succeeds.
//!
//! # Locking
//!
//! - `state` is a reader/writer lock over the snapshot and both indexes.
//!   Readers share it; the write side is taken only for the in-memory apply
//!   after a successful store call, or for the swap at the end of a reload.
//! - `write_gate` serializes every resolve, persist, apply sequence and every
//!   reload scan. Store I/O happens under the gate but never under `state`.
//!
//! The gate is always taken before `state`, never the other way round.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use steelcat_core::{
    execute, BulkSelector, CatalogError, CatalogResult, NewRecord, QueryPage, Record,
    RecordChanges, RecordId, RecordKey, RecordQuery,
};
use tokio::sync::{Mutex, RwLock};

use super::config::CacheConfig;
use super::served::Served;
use super::state::{CacheState, CacheStatus, CoherenceViolation, ReloadReport};
use crate::store::{RecordStore, StoreQuery};

/// Full-catalog cache that stays consistent with its store.
pub struct ConsistencyCache<S: RecordStore> {
    store: Arc<S>,
    state: RwLock<CacheState>,
    write_gate: Mutex<()>,
    config: CacheConfig,
}

impl<S: RecordStore> ConsistencyCache<S> {
    /// Create an unloaded cache in front of `store`.
    pub fn new(store: Arc<S>, config: CacheConfig) -> Self {
        Self {
            store,
            state: RwLock::new(CacheState::default()),
            write_gate: Mutex::new(()),
            config,
        }
    }

    /// Create an unloaded cache with default configuration.
    pub fn with_defaults(store: Arc<S>) -> Self {
        Self::new(store, CacheConfig::default())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The store behind this cache.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // ========================================================================
    // LIFECYCLE
    // ========================================================================

    /// Rebuild the snapshot and both indexes from a full store scan.
    ///
    /// The new state is built off to the side and swapped in at the end. On
    /// failure the previous state, loaded or not, is kept as it was.
    pub async fn reload(&self) -> CatalogResult<ReloadReport> {
        let _gate = self.write_gate.lock().await;
        let started = Instant::now();

        let scanned = match self.store.find_many(&StoreQuery::scan()).await {
            Ok(page) => page.records,
            Err(e) => {
                let loaded = self.state.read().await.loaded;
                tracing::warn!(
                    error = %e,
                    loaded,
                    "Cache reload failed; keeping previous state"
                );
                return Err(e);
            }
        };

        let synced_at = Utc::now();
        let (next, duplicate_specs) = CacheState::build(scanned, synced_at);
        if !duplicate_specs.is_empty() {
            tracing::warn!(
                count = duplicate_specs.len(),
                specs = ?duplicate_specs,
                "Store holds duplicate specs; indexing the first record of each"
            );
        }
        let record_count = next.len();
        *self.state.write().await = next;

        let elapsed = started.elapsed();
        tracing::info!(
            record_count,
            elapsed_ms = elapsed.as_millis() as u64,
            "Cache reloaded"
        );
        Ok(ReloadReport {
            record_count,
            last_sync: synced_at,
            elapsed,
            duplicate_specs,
        })
    }

    /// Current lifecycle state. Never touches the store.
    pub async fn status(&self) -> CacheStatus {
        self.state.read().await.status()
    }

    pub async fn is_loaded(&self) -> bool {
        self.state.read().await.loaded
    }

    /// Cross-check the snapshot against both indexes.
    pub async fn verify_coherence(&self) -> Result<(), CoherenceViolation> {
        self.state.read().await.verify()
    }

    /// Copy of the snapshot in its stable sequence. Empty while unloaded.
    pub async fn snapshot(&self) -> Vec<Record> {
        self.state
            .read()
            .await
            .snapshot
            .iter()
            .map(|r| Record::clone(r))
            .collect()
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// Filter, sort and paginate the catalog.
    pub async fn query(&self, query: &RecordQuery) -> CatalogResult<Served<QueryPage>> {
        {
            let state = self.state.read().await;
            if state.loaded {
                let page = execute(&state.snapshot, query);
                return Ok(Served::from_cache(page, state.last_sync));
            }
        }

        let result = self.store.find_many(&StoreQuery::from(query)).await?;
        Ok(Served::from_store(QueryPage::new(
            result.records,
            result.total_count,
            query.page,
        )))
    }

    /// Look up one record by id or spec. See [`RecordKey::parse`] for dispatch.
    pub async fn get(&self, key: &str) -> CatalogResult<Served<Record>> {
        self.get_by_key(&RecordKey::parse(key)).await
    }

    pub async fn get_by_key(&self, key: &RecordKey) -> CatalogResult<Served<Record>> {
        {
            let state = self.state.read().await;
            if state.loaded {
                if let Some(hit) = state.lookup(key) {
                    return Ok(Served::from_cache(Record::clone(hit), state.last_sync));
                }
                tracing::debug!(
                    key = %key,
                    by_id = key.is_id(),
                    "Cache miss, falling through to store"
                );
            }
        }

        self.store
            .find_one(key)
            .await?
            .map(Served::from_store)
            .ok_or_else(|| CatalogError::not_found(key.to_string()))
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Persist a new record. Fails with `DuplicateSpec` if the spec is taken.
    pub async fn create(&self, candidate: NewRecord) -> CatalogResult<Record> {
        candidate.validate()?;
        let _gate = self.write_gate.lock().await;

        if self.spec_holder(&candidate.spec).await?.is_some() {
            return Err(CatalogError::duplicate_spec(candidate.spec));
        }

        let record = self.store.insert(&candidate).await?;

        let mut state = self.state.write().await;
        if state.loaded {
            state.insert(record.clone());
        }
        tracing::debug!(
            id = %record.id,
            spec = %record.spec,
            cached = state.loaded,
            "Record created"
        );
        Ok(record)
    }

    /// Apply a full or partial update to the record addressed by `key`.
    ///
    /// The target is resolved through the store, not the snapshot.
    pub async fn update(&self, key: &str, changes: RecordChanges) -> CatalogResult<Record> {
        changes.validate()?;
        let key = RecordKey::parse(key);
        let _gate = self.write_gate.lock().await;

        let current = self
            .store
            .find_one(&key)
            .await?
            .ok_or_else(|| CatalogError::not_found(key.to_string()))?;

        if let Some(spec) = changes.spec.as_deref().filter(|s| *s != current.spec) {
            let holder = self.store.find_one(&RecordKey::Spec(spec.to_string())).await?;
            if holder.is_some_and(|r| r.id != current.id) {
                return Err(CatalogError::duplicate_spec(spec));
            }
        }

        let updated = self.store.update(current.id, &changes).await?;

        let mut state = self.state.write().await;
        if state.loaded {
            state.replace(updated.clone());
        }
        tracing::debug!(
            id = %updated.id,
            spec = %updated.spec,
            cached = state.loaded,
            "Record updated"
        );
        Ok(updated)
    }

    /// Delete the record addressed by `key` and return it.
    pub async fn delete(&self, key: &str) -> CatalogResult<Record> {
        let key = RecordKey::parse(key);
        let _gate = self.write_gate.lock().await;

        let removed = self.store.delete_one(&key).await?;

        let mut state = self.state.write().await;
        if state.loaded {
            state.remove(removed.id);
        }
        tracing::debug!(
            id = %removed.id,
            spec = %removed.spec,
            cached = state.loaded,
            "Record deleted"
        );
        Ok(removed)
    }

    /// Delete every record addressed by `selector`.
    ///
    /// Returns the store's deleted count, which may be smaller than the
    /// selector when some identifiers did not exist.
    pub async fn delete_many(&self, selector: &BulkSelector) -> CatalogResult<u64> {
        if selector.is_empty() {
            return Err(CatalogError::invalid_selector(
                "a non-empty ids or specs list is required",
            ));
        }
        let _gate = self.write_gate.lock().await;

        let deleted = self.store.delete_many(selector).await?;

        let mut state = self.state.write().await;
        if state.loaded {
            let evicted = state.remove_selected(selector);
            if evicted as u64 != deleted {
                tracing::debug!(deleted, evicted, "Bulk delete count differs from cached matches");
            }
        }
        tracing::debug!(deleted, requested = selector.len(), "Records bulk deleted");
        Ok(deleted)
    }

    /// Id of the record holding `spec`: the index when loaded, the store otherwise.
    async fn spec_holder(&self, spec: &str) -> CatalogResult<Option<RecordId>> {
        {
            let state = self.state.read().await;
            if state.loaded {
                return Ok(state.spec_holder(spec));
            }
        }
        Ok(self
            .store
            .find_one(&RecordKey::Spec(spec.to_string()))
            .await?
            .map(|r| r.id))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryRecordStore;
    use steelcat_core::{ErrorKind, PageRequest, RecordFilter, SortField, SortSpec};

    fn cache() -> ConsistencyCache<InMemoryRecordStore> {
        ConsistencyCache::with_defaults(Arc::new(InMemoryRecordStore::new()))
    }

    async fn loaded_cache(specs: &[&str]) -> ConsistencyCache<InMemoryRecordStore> {
        let cache = cache();
        for (i, spec) in specs.iter().enumerate() {
            cache
                .create(NewRecord::new(*spec, i as f64 + 1.0))
                .await
                .unwrap();
        }
        cache.reload().await.unwrap();
        cache
    }

    #[tokio::test]
    async fn test_new_cache_is_unloaded() {
        let cache = cache();
        let status = cache.status().await;
        assert!(!status.loaded);
        assert_eq!(status.record_count, 0);
        assert_eq!(status.last_sync, None);
        assert_eq!(cache.verify_coherence().await, Ok(()));
    }

    #[tokio::test]
    async fn test_reload_loads_store_contents() {
        let cache = loaded_cache(&["SS400-10", "S45C-20"]).await;
        let status = cache.status().await;
        assert!(status.loaded);
        assert_eq!(status.record_count, 2);
        assert!(status.last_sync.is_some());
        assert_eq!(cache.verify_coherence().await, Ok(()));
    }

    #[tokio::test]
    async fn test_get_served_from_cache_when_loaded() {
        let cache = loaded_cache(&["SS400-10"]).await;
        let by_spec = cache.get("SS400-10").await.unwrap();
        assert!(by_spec.was_cache_hit());

        let by_id = cache.get(&by_spec.value().id.to_string()).await.unwrap();
        assert!(by_id.was_cache_hit());
        assert_eq!(by_id.into_value(), by_spec.into_value());
    }

    #[tokio::test]
    async fn test_get_unloaded_passes_through() {
        let cache = cache();
        cache.create(NewRecord::new("SS400-10", 7.85)).await.unwrap();

        let served = cache.get("SS400-10").await.unwrap();
        assert!(!served.was_cache_hit());
        assert_eq!(cache.status().await.record_count, 0);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found_in_both_states() {
        let cache = cache();
        assert_eq!(cache.get("nope").await.unwrap_err().kind(), ErrorKind::NotFound);
        cache.reload().await.unwrap();
        assert_eq!(cache.get("nope").await.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_miss_while_loaded_falls_through_to_store() {
        let cache = loaded_cache(&[]).await;
        let outside = Record::from_new(RecordId::now_v7(), NewRecord::new("EXT-1", 3.0));
        cache.store().put(outside.clone()).unwrap();

        let served = cache.get("EXT-1").await.unwrap();
        assert!(!served.was_cache_hit());
        assert_eq!(served.into_value(), outside);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_spec_loaded_and_unloaded() {
        let cache = cache();
        cache.create(NewRecord::new("SS400-10", 7.85)).await.unwrap();
        let err = cache.create(NewRecord::new("SS400-10", 1.0)).await.unwrap_err();
        assert_eq!(err, CatalogError::duplicate_spec("SS400-10"));

        cache.reload().await.unwrap();
        let err = cache.create(NewRecord::new("SS400-10", 1.0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateSpec);
        assert_eq!(cache.status().await.record_count, 1);
        assert_eq!(cache.store().len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_validates_before_store() {
        let cache = cache();
        let err = cache.create(NewRecord::new("  ", 1.0)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(cache.store().is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_create_appends_to_loaded_snapshot() {
        let cache = loaded_cache(&["A", "B"]).await;
        let created = cache.create(NewRecord::new("C", 3.0)).await.unwrap();

        let snapshot = cache.snapshot().await;
        assert_eq!(snapshot.last(), Some(&created));
        assert_eq!(cache.get("C").await.unwrap().into_value(), created);
        assert_eq!(cache.verify_coherence().await, Ok(()));
    }

    #[tokio::test]
    async fn test_update_partial_reflects_immediately() {
        let cache = loaded_cache(&["SS400-10"]).await;
        let updated = cache
            .update("SS400-10", RecordChanges::new().wpm(8.0))
            .await
            .unwrap();
        assert_eq!(updated.wpm, 8.0);

        let served = cache.get("SS400-10").await.unwrap();
        assert!(served.was_cache_hit());
        assert_eq!(served.value().wpm, 8.0);
        assert_eq!(cache.verify_coherence().await, Ok(()));
    }

    #[tokio::test]
    async fn test_update_changes_spec_and_keeps_position() {
        let cache = loaded_cache(&["A", "B", "C"]).await;
        cache.update("B", RecordChanges::new().spec("B2")).await.unwrap();

        let specs: Vec<_> = cache.snapshot().await.into_iter().map(|r| r.spec).collect();
        assert_eq!(specs, vec!["A", "B2", "C"]);
        assert_eq!(cache.get("B").await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(cache.verify_coherence().await, Ok(()));
    }

    #[tokio::test]
    async fn test_update_to_taken_spec_is_duplicate() {
        let cache = loaded_cache(&["A", "B"]).await;
        let err = cache
            .update("B", RecordChanges::new().spec("A"))
            .await
            .unwrap_err();
        assert_eq!(err, CatalogError::duplicate_spec("A"));
        assert_eq!(cache.get("B").await.unwrap().value().spec, "B");

        // Setting a record's spec to its own current value is not a conflict.
        assert!(cache.update("A", RecordChanges::new().spec("A")).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let cache = loaded_cache(&["A"]).await;
        let err = cache
            .update("missing", RecordChanges::new().wpm(1.0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_update_appends_record_unknown_to_cache() {
        let cache = loaded_cache(&["A"]).await;
        let outside = Record::from_new(RecordId::now_v7(), NewRecord::new("EXT-1", 3.0));
        cache.store().put(outside.clone()).unwrap();

        cache.update("EXT-1", RecordChanges::new().wpm(4.0)).await.unwrap();
        let snapshot = cache.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[1].id, outside.id);
        assert_eq!(snapshot[1].wpm, 4.0);
        assert_eq!(cache.verify_coherence().await, Ok(()));
    }

    #[tokio::test]
    async fn test_delete_removes_from_all_views() {
        let cache = loaded_cache(&["A", "B"]).await;
        let removed = cache.delete("A").await.unwrap();
        assert_eq!(removed.spec, "A");

        assert_eq!(cache.status().await.record_count, 1);
        assert_eq!(
            cache.get(&removed.id.to_string()).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(cache.delete("A").await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(cache.verify_coherence().await, Ok(()));
    }

    #[tokio::test]
    async fn test_delete_many_reports_store_count() {
        let cache = loaded_cache(&["A", "B", "C"]).await;
        let selector = BulkSelector::Specs(vec!["A".into(), "C".into(), "missing".into()]);
        assert_eq!(cache.delete_many(&selector).await.unwrap(), 2);

        let specs: Vec<_> = cache.snapshot().await.into_iter().map(|r| r.spec).collect();
        assert_eq!(specs, vec!["B"]);
        assert_eq!(cache.verify_coherence().await, Ok(()));
    }

    #[tokio::test]
    async fn test_delete_many_rejects_empty_selector() {
        let cache = loaded_cache(&["A"]).await;
        let err = cache
            .delete_many(&BulkSelector::Ids(Vec::new()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(cache.store().len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_query_loaded_and_unloaded_agree() {
        let store = Arc::new(InMemoryRecordStore::new());
        let cache = ConsistencyCache::with_defaults(Arc::clone(&store));
        for (spec, product) in [("SS400-10", "plate"), ("S45C-20", "bar"), ("SS400-12", "Plate")] {
            cache
                .create(NewRecord::new(spec, 1.0).with_product(product))
                .await
                .unwrap();
        }
        let query = RecordQuery::all()
            .with_filter(RecordFilter::new().product("PLATE"))
            .with_sort(SortSpec::desc(SortField::Spec))
            .with_page(PageRequest::page(1, 1));

        let degraded = cache.query(&query).await.unwrap();
        assert!(!degraded.was_cache_hit());

        cache.reload().await.unwrap();
        let cached = cache.query(&query).await.unwrap();
        assert!(cached.was_cache_hit());

        assert_eq!(cached.into_value(), degraded.into_value());
    }

    #[tokio::test]
    async fn test_query_unpaginated_single_page() {
        let cache = loaded_cache(&["A", "B", "C"]).await;
        let page = cache.query(&RecordQuery::all()).await.unwrap().into_value();
        assert_eq!(page.records.len(), 3);
        assert_eq!(page.total_count, 3);
        assert_eq!(page.page_count, 1);
        assert_eq!(page.page_size, None);
    }

    #[tokio::test]
    async fn test_query_with_raw_page_variants_in_both_states() {
        let cache = cache();
        for spec in ["A", "B", "C"] {
            cache.create(NewRecord::new(spec, 1.0)).await.unwrap();
        }
        let zero_page = RecordQuery::all().with_page(PageRequest::Page { page: 0, size: 2 });
        let zero_size = RecordQuery::all().with_page(PageRequest::Page { page: 4, size: 0 });

        let degraded_page = cache.query(&zero_page).await.unwrap().into_value();
        let degraded_all = cache.query(&zero_size).await.unwrap().into_value();
        assert_eq!(degraded_page.records.len(), 2);
        assert_eq!(degraded_page.page, 1);
        assert_eq!(degraded_all.records.len(), 3);
        assert_eq!(degraded_all.page_count, 1);

        cache.reload().await.unwrap();
        assert_eq!(cache.query(&zero_page).await.unwrap().into_value(), degraded_page);
        assert_eq!(cache.query(&zero_size).await.unwrap().into_value(), degraded_all);
    }

    #[tokio::test]
    async fn test_reload_is_idempotent() {
        let cache = loaded_cache(&["A", "B", "C"]).await;
        let first = cache.snapshot().await;
        let report = cache.reload().await.unwrap();
        assert_eq!(report.record_count, 3);
        assert_eq!(cache.snapshot().await, first);
    }
}
