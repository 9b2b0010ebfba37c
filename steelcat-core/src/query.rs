//! Query vocabulary: filters, sorting, pagination and bulk selectors.
//!
//! [`execute`] is the reference evaluation of a [`RecordQuery`] over an ordered
//! sequence of records. Both the cache and the in-memory store use it, so a
//! cache-served query and a store-served query agree for the same input.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::{CatalogError, CatalogResult, Record, RecordId};

// ============================================================================
// FILTERS
// ============================================================================

/// Record filter. All supplied fields combine with logical AND.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    /// Case-insensitive substring match
    pub spec: Option<String>,
    /// Case-insensitive substring match
    pub product: Option<String>,
    /// Exact match
    pub method_calc: Option<i64>,
    /// Exact match
    pub cat_product: Option<i64>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spec(mut self, needle: impl Into<String>) -> Self {
        self.spec = Some(needle.into());
        self
    }

    pub fn product(mut self, needle: impl Into<String>) -> Self {
        self.product = Some(needle.into());
        self
    }

    pub fn method_calc(mut self, value: i64) -> Self {
        self.method_calc = Some(value);
        self
    }

    pub fn cat_product(mut self, value: i64) -> Self {
        self.cat_product = Some(value);
        self
    }

    /// Returns true if no constraint is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Compile into a matcher with lowercased needles.
    pub fn compile(&self) -> CompiledFilter {
        CompiledFilter {
            spec: self.spec.as_ref().map(|s| s.to_lowercase()),
            product: self.product.as_ref().map(|s| s.to_lowercase()),
            method_calc: self.method_calc,
            cat_product: self.cat_product,
        }
    }

    /// Check a single record. Prefer [`RecordFilter::compile`] for scans.
    pub fn matches(&self, record: &Record) -> bool {
        self.compile().matches(record)
    }
}

/// A [`RecordFilter`] with needles normalized for repeated matching.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    spec: Option<String>,
    product: Option<String>,
    method_calc: Option<i64>,
    cat_product: Option<i64>,
}

impl CompiledFilter {
    pub fn matches(&self, record: &Record) -> bool {
        contains_ci(&record.spec, self.spec.as_deref())
            && contains_ci(&record.product, self.product.as_deref())
            && self.method_calc.map_or(true, |v| record.method_calc == v)
            && self.cat_product.map_or(true, |v| record.cat_product == v)
    }
}

fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    match needle {
        Some(needle) => haystack.to_lowercase().contains(needle),
        None => true,
    }
}

// ============================================================================
// SORTING
// ============================================================================

/// Sortable record fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Id,
    Spec,
    Wpm,
    Product,
    MethodCalc,
    InitialLength,
    TradeUnit,
    CatProduct,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Spec => "spec",
            SortField::Wpm => "wpm",
            SortField::Product => "product",
            SortField::MethodCalc => "method_calc",
            SortField::InitialLength => "initial_length",
            SortField::TradeUnit => "trade_unit",
            SortField::CatProduct => "cat_product",
        }
    }

    /// Natural ordering of two records on this field.
    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        match self {
            SortField::Id => a.id.cmp(&b.id),
            SortField::Spec => a.spec.cmp(&b.spec),
            SortField::Wpm => a.wpm.total_cmp(&b.wpm),
            SortField::Product => a.product.cmp(&b.product),
            SortField::MethodCalc => a.method_calc.cmp(&b.method_calc),
            SortField::InitialLength => a.initial_length.total_cmp(&b.initial_length),
            SortField::TradeUnit => a.trade_unit.cmp(&b.trade_unit),
            SortField::CatProduct => a.cat_product.cmp(&b.cat_product),
        }
    }
}

impl FromStr for SortField {
    type Err = CatalogError;

    fn from_str(s: &str) -> CatalogResult<Self> {
        match s.trim() {
            "id" | "_id" => Ok(SortField::Id),
            "spec" => Ok(SortField::Spec),
            "wpm" => Ok(SortField::Wpm),
            "product" => Ok(SortField::Product),
            "method_calc" => Ok(SortField::MethodCalc),
            "initial_length" => Ok(SortField::InitialLength),
            "trade_unit" => Ok(SortField::TradeUnit),
            "cat_product" => Ok(SortField::CatProduct),
            other => Err(CatalogError::invalid_value(
                "sort",
                format!("unknown sort field {:?}", other),
            )),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction. Ascending unless explicitly descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl FromStr for SortDirection {
    type Err = CatalogError;

    fn from_str(s: &str) -> CatalogResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "asc" | "ascending" | "1" => Ok(SortDirection::Ascending),
            "desc" | "descending" | "-1" => Ok(SortDirection::Descending),
            other => Err(CatalogError::invalid_value(
                "order",
                format!("unknown sort direction {:?}", other),
            )),
        }
    }
}

/// Sort field plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: SortField) -> Self {
        Self {
            field,
            direction: SortDirection::Descending,
        }
    }

    /// Parse raw transport parameters. An absent field means "no sort".
    pub fn from_raw(field: Option<&str>, direction: Option<&str>) -> CatalogResult<Option<Self>> {
        let Some(field) = field.filter(|f| !f.trim().is_empty()) else {
            return Ok(None);
        };
        Ok(Some(Self {
            field: field.parse()?,
            direction: direction
                .map(str::parse::<SortDirection>)
                .transpose()?
                .unwrap_or_default(),
        }))
    }

    /// Stable sort in place. Ties keep their existing relative order.
    pub fn apply<R: AsRef<Record>>(&self, records: &mut [R]) {
        let field = self.field;
        match self.direction {
            SortDirection::Ascending => {
                records.sort_by(|a, b| field.compare(a.as_ref(), b.as_ref()))
            }
            SortDirection::Descending => {
                records.sort_by(|a, b| field.compare(b.as_ref(), a.as_ref()))
            }
        }
    }
}

impl AsRef<Record> for Record {
    fn as_ref(&self) -> &Record {
        self
    }
}

// ============================================================================
// PAGINATION
// ============================================================================

/// Page-size sentinel meaning "return everything as one page".
pub const UNPAGINATED: i64 = -1;

/// Pagination request.
///
/// Values built directly as `Page { .. }` are normalized the same way as
/// [`PageRequest::page`] before any arithmetic, and so are deserialized ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RawPageRequest")]
pub enum PageRequest {
    /// Entire result as a single page
    #[default]
    All,
    /// 1-based page of `size` records
    Page { page: u32, size: u32 },
}

/// Wire shape of [`PageRequest`] before normalization.
#[derive(Deserialize)]
enum RawPageRequest {
    All,
    Page { page: u32, size: u32 },
}

impl From<RawPageRequest> for PageRequest {
    fn from(raw: RawPageRequest) -> Self {
        match raw {
            RawPageRequest::All => PageRequest::All,
            RawPageRequest::Page { page, size } => PageRequest::page(page, size),
        }
    }
}

impl PageRequest {
    /// Create a paginated request. `page` below 1 is treated as 1; a zero
    /// `size` means unpaginated.
    pub fn page(page: u32, size: u32) -> Self {
        if size == 0 {
            return PageRequest::All;
        }
        PageRequest::Page {
            page: page.max(1),
            size,
        }
    }

    /// Interpret raw transport values. A `page_size` that is absent or not
    /// positive (e.g. [`UNPAGINATED`]) requests no pagination.
    pub fn from_raw(page: Option<i64>, page_size: Option<i64>) -> Self {
        match page_size {
            Some(size) if size > 0 => {
                let size = u32::try_from(size).unwrap_or(u32::MAX);
                let page = page
                    .filter(|p| *p >= 1)
                    .map(|p| u32::try_from(p).unwrap_or(u32::MAX))
                    .unwrap_or(1);
                PageRequest::Page { page, size }
            }
            _ => PageRequest::All,
        }
    }

    /// Slice bounds `[start, end)` for a result of `total` records.
    pub fn bounds(&self, total: usize) -> (usize, usize) {
        match self.normalized() {
            PageRequest::All => (0, total),
            PageRequest::Page { page, size } => {
                let size = size as usize;
                let start = (page as usize).saturating_sub(1).saturating_mul(size).min(total);
                let end = start.saturating_add(size).min(total);
                (start, end)
            }
        }
    }

    /// Number of pages for a result of `total` records.
    pub fn page_count(&self, total: usize) -> usize {
        match self.normalized() {
            PageRequest::All => usize::from(total > 0),
            PageRequest::Page { size, .. } => total.div_ceil(size as usize),
        }
    }

    /// Store-native offset/limit form. `None` limit means unbounded.
    pub fn offset_limit(&self) -> (usize, Option<usize>) {
        match self.normalized() {
            PageRequest::All => (0, None),
            PageRequest::Page { page, size } => {
                let size = size as usize;
                let offset = (page as usize).saturating_sub(1).saturating_mul(size);
                (offset, Some(size))
            }
        }
    }

    /// The same request with `page` at least 1 and a zero `size` as [`PageRequest::All`].
    pub fn normalized(self) -> Self {
        match self {
            PageRequest::All => PageRequest::All,
            PageRequest::Page { page, size } => PageRequest::page(page, size),
        }
    }
}

/// A full query over the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordQuery {
    pub filter: RecordFilter,
    pub sort: Option<SortSpec>,
    pub page: PageRequest,
}

impl RecordQuery {
    /// Everything, in store order.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: RecordFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }
}

/// One page of query results plus pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPage {
    pub records: Vec<Record>,
    /// Number of records matching the filter, across all pages
    pub total_count: usize,
    /// 1-based page number (1 when unpaginated)
    pub page: u32,
    /// `None` when unpaginated
    pub page_size: Option<u32>,
    pub page_count: usize,
}

impl QueryPage {
    /// Assemble a page from an already filtered and sorted result slice.
    pub fn new(records: Vec<Record>, total_count: usize, request: PageRequest) -> Self {
        let request = request.normalized();
        let (page, page_size) = match request {
            PageRequest::All => (1, None),
            PageRequest::Page { page, size } => (page, Some(size)),
        };
        Self {
            records,
            total_count,
            page,
            page_size,
            page_count: request.page_count(total_count),
        }
    }
}

/// Filter, sort and paginate `records` without mutating them.
///
/// `records` must be in the caller's stable sequence; sort ties keep that order.
pub fn execute<'a, R, I>(records: I, query: &RecordQuery) -> QueryPage
where
    R: AsRef<Record> + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let filter = query.filter.compile();
    let mut matched: Vec<&Record> = records
        .into_iter()
        .map(|r| <R as AsRef<Record>>::as_ref(r))
        .filter(|r| filter.matches(r))
        .collect();

    if let Some(sort) = &query.sort {
        sort.apply(&mut matched);
    }

    let total = matched.len();
    let (start, end) = query.page.bounds(total);
    let page = matched[start..end].iter().map(|r| (*r).clone()).collect();
    QueryPage::new(page, total, query.page)
}

// ============================================================================
// BULK SELECTORS
// ============================================================================

/// Identifier set for bulk deletion: ids or specs, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulkSelector {
    Ids(Vec<RecordId>),
    Specs(Vec<String>),
}

impl BulkSelector {
    /// Build from raw transport input. Exactly one of `ids` / `specs` must be
    /// supplied and non-empty, and every id must be id-shaped.
    pub fn from_parts(ids: Option<Vec<String>>, specs: Option<Vec<String>>) -> CatalogResult<Self> {
        let ids = ids.filter(|v| !v.is_empty());
        let specs = specs.filter(|v| !v.is_empty());
        match (ids, specs) {
            (Some(_), Some(_)) => Err(CatalogError::invalid_selector(
                "supply either ids or specs, not both",
            )),
            (None, None) => Err(CatalogError::invalid_selector(
                "a non-empty ids or specs list is required",
            )),
            (Some(ids), None) => {
                let parsed = ids
                    .iter()
                    .map(|raw| {
                        raw.parse::<RecordId>().map_err(|_| {
                            CatalogError::invalid_selector(format!("malformed id {:?}", raw))
                        })
                    })
                    .collect::<CatalogResult<Vec<_>>>()?;
                Ok(BulkSelector::Ids(parsed))
            }
            (None, Some(specs)) => Ok(BulkSelector::Specs(specs)),
        }
    }

    /// Returns true if `record` is addressed by this selector.
    pub fn selects(&self, record: &Record) -> bool {
        match self {
            BulkSelector::Ids(ids) => ids.contains(&record.id),
            BulkSelector::Specs(specs) => specs.iter().any(|s| *s == record.spec),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            BulkSelector::Ids(ids) => ids.len(),
            BulkSelector::Specs(specs) => specs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
