//! Steelcat Test Utilities
//!
//! Shared test infrastructure for the steelcat workspace:
//! - Proptest generators for records and queries
//! - Fixtures for common scenarios
//! - A fault-injecting [`RecordStore`] wrapper
//! - Assertions over catalog results

pub use steelcat_core::*;
pub use steelcat_storage::{
    CacheConfig, CacheStatus, CoherenceViolation, ConsistencyCache, InMemoryRecordStore,
    RecordStore, ReloadReport, Served, StorePage, StoreQuery,
};

pub mod faults;
pub use faults::{FaultyStore, StoreOp};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for catalog types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a spec. Always contains a hyphen, so it never dispatches as an id.
    pub fn arb_spec() -> impl Strategy<Value = String> {
        "[A-Z]{1,4}[0-9]{2,3}-[0-9]{1,2}"
    }

    /// Generate a weight per meter.
    pub fn arb_wpm() -> impl Strategy<Value = f64> {
        0.1f64..200.0
    }

    /// Generate a product name, sometimes empty.
    pub fn arb_product() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            Just("plate".to_string()),
            Just("Plate".to_string()),
            Just("round bar".to_string()),
            Just("sheet".to_string()),
            Just("H-beam".to_string()),
        ]
    }

    fn arb_attributes() -> impl Strategy<Value = (f64, String, i64, f64, i64, i64)> {
        (
            arb_wpm(),
            arb_product(),
            0i64..4,
            prop_oneof![Just(0.0), 100.0f64..12000.0],
            0i64..3,
            0i64..4,
        )
    }

    fn build(spec: String, attrs: (f64, String, i64, f64, i64, i64)) -> NewRecord {
        let (wpm, product, method_calc, initial_length, trade_unit, cat_product) = attrs;
        NewRecord::new(spec, wpm)
            .with_product(product)
            .with_method_calc(method_calc)
            .with_initial_length(initial_length)
            .with_trade_unit(trade_unit)
            .with_cat_product(cat_product)
    }

    /// Generate a single valid candidate.
    pub fn arb_new_record() -> impl Strategy<Value = NewRecord> {
        (arb_spec(), arb_attributes()).prop_map(|(spec, attrs)| build(spec, attrs))
    }

    /// Generate up to `max` candidates with pairwise distinct specs.
    pub fn arb_catalog(max: usize) -> impl Strategy<Value = Vec<NewRecord>> {
        proptest::collection::hash_set(arb_spec(), 0..max).prop_flat_map(|specs| {
            let specs: Vec<String> = specs.into_iter().collect();
            proptest::collection::vec(arb_attributes(), specs.len()).prop_map(move |attrs| {
                specs
                    .iter()
                    .cloned()
                    .zip(attrs)
                    .map(|(spec, attrs)| build(spec, attrs))
                    .collect()
            })
        })
    }

    /// Generate a filter with each field independently present or absent.
    pub fn arb_filter() -> impl Strategy<Value = RecordFilter> {
        (
            proptest::option::of("[A-Za-z0-9]{0,2}"),
            proptest::option::of(prop_oneof![Just("plate"), Just("BAR"), Just("e")]),
            proptest::option::of(0i64..4),
            proptest::option::of(0i64..4),
        )
            .prop_map(|(spec, product, method_calc, cat_product)| RecordFilter {
                spec,
                product: product.map(str::to_string),
                method_calc,
                cat_product,
            })
    }

    /// Generate a sort field.
    pub fn arb_sort_field() -> impl Strategy<Value = SortField> {
        prop_oneof![
            Just(SortField::Id),
            Just(SortField::Spec),
            Just(SortField::Wpm),
            Just(SortField::Product),
            Just(SortField::MethodCalc),
            Just(SortField::InitialLength),
            Just(SortField::TradeUnit),
            Just(SortField::CatProduct),
        ]
    }

    /// Generate an optional sort.
    pub fn arb_sort() -> impl Strategy<Value = Option<SortSpec>> {
        let direction = prop_oneof![
            Just(SortDirection::Ascending),
            Just(SortDirection::Descending)
        ];
        proptest::option::of(
            (arb_sort_field(), direction)
                .prop_map(|(field, direction)| SortSpec { field, direction }),
        )
    }

    /// Generate a pagination request, including pages past the end.
    pub fn arb_page() -> impl Strategy<Value = PageRequest> {
        prop_oneof![
            Just(PageRequest::All),
            (1u32..8, 1u32..10).prop_map(|(page, size)| PageRequest::page(page, size)),
        ]
    }

    /// Generate a complete query.
    pub fn arb_query() -> impl Strategy<Value = RecordQuery> {
        (arb_filter(), arb_sort(), arb_page()).prop_map(|(filter, sort, page)| RecordQuery {
            filter,
            sort,
            page,
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common scenarios.

    use super::*;
    use serde_json::{json, Value};

    /// The SS400 plate record used throughout the end-to-end scenario.
    pub fn ss400_scenario() -> NewRecord {
        NewRecord::new("SS400-10", 7.85)
            .with_product("plate")
            .with_method_calc(1)
            .with_initial_length(1000.0)
            .with_trade_unit(1)
            .with_cat_product(2)
    }

    /// [`ss400_scenario`] as loose transport input.
    pub fn ss400_scenario_json() -> Value {
        json!({
            "spec": "SS400-10",
            "wpm": 7.85,
            "product": "plate",
            "method_calc": 1,
            "initial_length": 1000,
            "trade_unit": 1,
            "cat_product": 2
        })
    }

    /// A small mixed catalog with distinct specs.
    pub fn sample_catalog() -> Vec<NewRecord> {
        vec![
            ss400_scenario(),
            NewRecord::new("SS400-12", 9.42).with_product("plate").with_method_calc(1),
            NewRecord::new("S45C-20", 2.47).with_product("round bar").with_method_calc(2),
            NewRecord::new("SUS304-5", 1.57).with_product("sheet").with_cat_product(3),
            NewRecord::new("SM490-100", 78.5).with_product("H-beam").with_trade_unit(2),
        ]
    }

    /// Materialize candidates with fresh, increasing ids.
    pub fn records_from(candidates: &[NewRecord]) -> Vec<Record> {
        candidates
            .iter()
            .cloned()
            .map(|c| Record::from_new(RecordId::now_v7(), c))
            .collect()
    }

    /// An in-memory store pre-populated with `candidates`, in order.
    pub fn seeded_store(candidates: &[NewRecord]) -> InMemoryRecordStore {
        InMemoryRecordStore::with_records(records_from(candidates))
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over catalog results.

    use super::*;

    /// Assert that a result failed with the given kind.
    #[track_caller]
    pub fn assert_kind<T: std::fmt::Debug>(result: &CatalogResult<T>, kind: ErrorKind) {
        match result {
            Err(e) => assert_eq!(e.kind(), kind, "Wrong error kind for: {}", e),
            Ok(v) => panic!("Expected {} error, got Ok: {:?}", kind, v),
        }
    }

    /// Assert that a result is a NotFound error.
    #[track_caller]
    pub fn assert_not_found<T: std::fmt::Debug>(result: &CatalogResult<T>) {
        assert_kind(result, ErrorKind::NotFound);
    }

    /// Assert that a result is a DuplicateSpec error for `spec`.
    #[track_caller]
    pub fn assert_duplicate_spec<T: std::fmt::Debug>(result: &CatalogResult<T>, spec: &str) {
        match result {
            Err(CatalogError::DuplicateSpec { spec: s }) => {
                assert_eq!(s, spec, "Wrong spec in DuplicateSpec error");
            }
            other => panic!("Expected DuplicateSpec for {}, got: {:?}", spec, other),
        }
    }

    /// Assert that a result is a StoreUnavailable error.
    #[track_caller]
    pub fn assert_store_unavailable<T: std::fmt::Debug>(result: &CatalogResult<T>) {
        assert_kind(result, ErrorKind::StoreUnavailable);
    }

    /// Assert that a read was answered from the snapshot.
    #[track_caller]
    pub fn assert_cache_hit<T>(served: &Served<T>) {
        assert!(served.was_cache_hit(), "Expected a cache-served result");
    }

    /// Assert that a read was answered by the store.
    #[track_caller]
    pub fn assert_store_served<T>(served: &Served<T>) {
        assert!(!served.was_cache_hit(), "Expected a store-served result");
    }

    /// Assert that the snapshot and both indexes agree.
    #[track_caller]
    pub fn assert_coherent(check: Result<(), CoherenceViolation>) {
        if let Err(violation) = check {
            panic!("Cache coherence violated: {}", violation);
        }
    }

    /// Assert that two records are equal ignoring their ids.
    #[track_caller]
    pub fn assert_same_content(a: &Record, b: &Record) {
        let mut b = b.clone();
        b.id = a.id;
        assert_eq!(a, &b, "Record contents differ");
    }
}

// ============================================================================
// TESTS
// ============================================================================
