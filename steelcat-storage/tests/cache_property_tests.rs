//! Property-Based Tests for the Consistency Cache
//!
//! - Cached and degraded reads agree for every query
//! - Pages concatenate to the unpaginated result
//! - Duplicate specs are rejected in both states without touching state
//! - Every successful write is visible to the next read

use std::sync::Arc;

use proptest::prelude::*;
use steelcat_test_utils::assertions::assert_coherent;
use steelcat_test_utils::fixtures::seeded_store;
use steelcat_test_utils::generators::{arb_catalog, arb_query};
use steelcat_test_utils::{
    ConsistencyCache, ErrorKind, InMemoryRecordStore, NewRecord, PageRequest, RecordChanges,
};

fn cache_over(candidates: &[NewRecord]) -> ConsistencyCache<InMemoryRecordStore> {
    ConsistencyCache::with_defaults(Arc::new(seeded_store(candidates)))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// An unloaded cache returns exactly what the store returns, and a loaded
    /// cache returns the same page again from its snapshot.
    #[test]
    fn prop_cached_query_matches_degraded_query(
        catalog in arb_catalog(25),
        query in arb_query(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let cache = cache_over(&catalog);

            let degraded = cache.query(&query).await.unwrap();
            prop_assert!(!degraded.was_cache_hit());

            cache.reload().await.unwrap();
            let cached = cache.query(&query).await.unwrap();
            prop_assert!(cached.was_cache_hit());

            prop_assert_eq!(cached.into_value(), degraded.into_value());
            Ok(())
        })?;
    }

    /// Concatenating pages 1..=page_count yields the unpaginated sequence.
    #[test]
    fn prop_pages_concatenate(
        catalog in arb_catalog(25),
        query in arb_query(),
        size in 1u32..7,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let cache = cache_over(&catalog);
            cache.reload().await.unwrap();

            let full = cache
                .query(&query.clone().with_page(PageRequest::All))
                .await
                .unwrap()
                .into_value();

            let first = cache
                .query(&query.clone().with_page(PageRequest::page(1, size)))
                .await
                .unwrap()
                .into_value();
            prop_assert_eq!(first.total_count, full.total_count);
            prop_assert_eq!(first.page_count, full.total_count.div_ceil(size as usize));

            let mut stitched = Vec::with_capacity(full.records.len());
            for page in 1..=first.page_count {
                let chunk = cache
                    .query(&query.clone().with_page(PageRequest::page(page as u32, size)))
                    .await
                    .unwrap()
                    .into_value();
                stitched.extend(chunk.records);
            }
            prop_assert_eq!(stitched, full.records);
            Ok(())
        })?;
    }

    /// Creating an existing spec fails with DuplicateSpec whether or not the
    /// cache is loaded, and nothing changes.
    #[test]
    fn prop_duplicate_spec_rejected(
        catalog in arb_catalog(15).prop_filter("needs a record", |c| !c.is_empty()),
        pick in any::<prop::sample::Index>(),
        loaded in any::<bool>(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let cache = cache_over(&catalog);
            if loaded {
                cache.reload().await.unwrap();
            }
            let before_status = cache.status().await;
            let before_store = cache.store().records().unwrap();

            let taken = pick.get(&catalog).spec.clone();
            let err = cache.create(NewRecord::new(taken, 1.0)).await.unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::DuplicateSpec);

            let after_status = cache.status().await;
            prop_assert_eq!(after_status.record_count, before_status.record_count);
            prop_assert_eq!(after_status.loaded, before_status.loaded);
            prop_assert_eq!(cache.store().records().unwrap(), before_store);
            Ok(())
        })?;
    }

    /// After an update or delete, the next read reflects it without a reload.
    #[test]
    fn prop_write_then_read(
        catalog in arb_catalog(15).prop_filter("needs a record", |c| !c.is_empty()),
        pick in any::<prop::sample::Index>(),
        wpm in 0.0f64..500.0,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let cache = cache_over(&catalog);
            cache.reload().await.unwrap();
            let spec = pick.get(&catalog).spec.clone();

            cache.update(&spec, RecordChanges::new().wpm(wpm)).await.unwrap();
            let served = cache.get(&spec).await.unwrap();
            prop_assert!(served.was_cache_hit());
            prop_assert_eq!(served.value().wpm, wpm);

            let removed = cache.delete(&spec).await.unwrap();
            let err = cache.get(&removed.id.to_string()).await.unwrap_err();
            prop_assert_eq!(err.kind(), ErrorKind::NotFound);
            prop_assert_eq!(cache.status().await.record_count, catalog.len() - 1);
            assert_coherent(cache.verify_coherence().await);
            Ok(())
        })?;
    }
}
