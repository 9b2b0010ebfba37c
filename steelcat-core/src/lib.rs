//! Steelcat Core - Catalog Data Types
//!
//! Pure data structures for the steel material catalog. All other crates
//! depend on this. No I/O lives here: records, identity and key dispatch,
//! the query vocabulary, lenient input coercion and the error taxonomy.

pub mod coerce;
pub mod error;
pub mod identity;
pub mod query;
pub mod record;

pub use error::{CatalogError, CatalogResult, ErrorKind, StoreError, ValidationError};
pub use identity::{is_id_shaped, RecordId, RecordKey, RECORD_ID_LEN};
pub use query::{
    execute, BulkSelector, CompiledFilter, PageRequest, QueryPage, RecordFilter, RecordQuery,
    SortDirection, SortField, SortSpec, UNPAGINATED,
};
pub use record::{NewRecord, Record, RecordChanges};

/// Timestamp type using UTC timezone.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_record() -> impl Strategy<Value = Record> {
        (
            "[A-Za-z0-9-]{1,8}",
            0.0f64..100.0,
            "[a-z ]{0,6}",
            0i64..4,
            0i64..4,
        )
            .prop_map(|(spec, wpm, product, method_calc, cat_product)| {
                Record::from_new(
                    RecordId::now_v7(),
                    NewRecord::new(spec, wpm)
                        .with_product(product)
                        .with_method_calc(method_calc)
                        .with_cat_product(cat_product),
                )
            })
    }

    fn arb_sort() -> impl Strategy<Value = Option<SortSpec>> {
        let field = prop_oneof![
            Just(SortField::Spec),
            Just(SortField::Wpm),
            Just(SortField::Product),
            Just(SortField::MethodCalc),
            Just(SortField::CatProduct),
        ];
        let direction = prop_oneof![
            Just(SortDirection::Ascending),
            Just(SortDirection::Descending)
        ];
        proptest::option::of((field, direction).prop_map(|(field, direction)| SortSpec {
            field,
            direction,
        }))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Concatenating pages 1..=page_count reproduces the unpaginated result exactly.
        #[test]
        fn prop_pages_concatenate_to_full_result(
            records in proptest::collection::vec(arb_record(), 0..40),
            sort in arb_sort(),
            size in 1u32..10,
            method_calc in proptest::option::of(0i64..4),
        ) {
            let filter = RecordFilter { method_calc, ..RecordFilter::default() };
            let base = RecordQuery { filter, sort, page: PageRequest::All };
            let full = execute(&records, &base);

            let mut stitched = Vec::new();
            let first = execute(&records, &base.clone().with_page(PageRequest::page(1, size)));
            prop_assert_eq!(first.total_count, full.total_count);
            for page in 1..=first.page_count {
                let chunk = execute(
                    &records,
                    &base.clone().with_page(PageRequest::page(page as u32, size)),
                );
                prop_assert!(chunk.records.len() <= size as usize);
                stitched.extend(chunk.records);
            }
            prop_assert_eq!(stitched, full.records);
        }

        /// Every filtered result satisfies the filter and nothing matching is dropped.
        #[test]
        fn prop_filter_is_exact(
            records in proptest::collection::vec(arb_record(), 0..40),
            needle in "[a-z0-9]{0,2}",
        ) {
            let filter = RecordFilter::new().spec(needle.clone());
            let page = execute(&records, &RecordQuery::all().with_filter(filter));
            let expected = records
                .iter()
                .filter(|r| r.spec.to_lowercase().contains(&needle))
                .count();
            prop_assert_eq!(page.total_count, expected);
            for r in &page.records {
                prop_assert!(r.spec.to_lowercase().contains(&needle));
            }
        }

        /// Record ids always dispatch as ids; non-hex specs never do.
        #[test]
        fn prop_key_dispatch(spec in "[G-Zg-z-][A-Za-z0-9-]{0,40}") {
            let id = RecordId::now_v7();
            prop_assert_eq!(RecordKey::parse(&id.to_string()), RecordKey::Id(id));
            prop_assert_eq!(RecordKey::parse(&spec), RecordKey::Spec(spec.clone()));
        }
    }
}
