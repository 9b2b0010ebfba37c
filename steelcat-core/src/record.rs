//! Steel material specification records and their write-side inputs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::coerce::{coerce_f64, coerce_i64, coerce_string};
use crate::{CatalogError, CatalogResult, RecordId};

/// A steel material specification as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Store-assigned, immutable
    pub id: RecordId,
    /// Unique across all records
    pub spec: String,
    /// Weight per meter
    pub wpm: f64,
    pub product: String,
    pub method_calc: i64,
    pub initial_length: f64,
    pub trade_unit: i64,
    pub cat_product: i64,
}

impl Record {
    /// Materialize a candidate with a store-assigned id.
    pub fn from_new(id: RecordId, candidate: NewRecord) -> Self {
        Self {
            id,
            spec: candidate.spec,
            wpm: candidate.wpm,
            product: candidate.product,
            method_calc: candidate.method_calc,
            initial_length: candidate.initial_length,
            trade_unit: candidate.trade_unit,
            cat_product: candidate.cat_product,
        }
    }

    /// Return a copy of this record with `changes` applied. The id never changes.
    pub fn with_changes(&self, changes: &RecordChanges) -> Self {
        let mut next = self.clone();
        if let Some(spec) = &changes.spec {
            next.spec = spec.clone();
        }
        if let Some(wpm) = changes.wpm {
            next.wpm = wpm;
        }
        if let Some(product) = &changes.product {
            next.product = product.clone();
        }
        if let Some(method_calc) = changes.method_calc {
            next.method_calc = method_calc;
        }
        if let Some(initial_length) = changes.initial_length {
            next.initial_length = initial_length;
        }
        if let Some(trade_unit) = changes.trade_unit {
            next.trade_unit = trade_unit;
        }
        if let Some(cat_product) = changes.cat_product {
            next.cat_product = cat_product;
        }
        next
    }
}

/// A record candidate for creation (no id yet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub spec: String,
    pub wpm: f64,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub method_calc: i64,
    #[serde(default)]
    pub initial_length: f64,
    #[serde(default)]
    pub trade_unit: i64,
    #[serde(default)]
    pub cat_product: i64,
}

impl NewRecord {
    /// Create a candidate with the two required fields; all others default.
    pub fn new(spec: impl Into<String>, wpm: f64) -> Self {
        Self {
            spec: spec.into(),
            wpm,
            product: String::new(),
            method_calc: 0,
            initial_length: 0.0,
            trade_unit: 0,
            cat_product: 0,
        }
    }

    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = product.into();
        self
    }

    pub fn with_method_calc(mut self, method_calc: i64) -> Self {
        self.method_calc = method_calc;
        self
    }

    pub fn with_initial_length(mut self, initial_length: f64) -> Self {
        self.initial_length = initial_length;
        self
    }

    pub fn with_trade_unit(mut self, trade_unit: i64) -> Self {
        self.trade_unit = trade_unit;
        self
    }

    pub fn with_cat_product(mut self, cat_product: i64) -> Self {
        self.cat_product = cat_product;
        self
    }

    /// Parse a candidate from loose JSON input.
    ///
    /// `spec` and `wpm` must be present; numeric fields are coerced leniently
    /// (see [`crate::coerce`]). Unknown keys and any supplied `id` are ignored.
    pub fn from_json(input: &Value) -> CatalogResult<Self> {
        let fields = as_object(input)?;

        let spec = fields
            .get("spec")
            .filter(|v| !v.is_null())
            .map(coerce_string)
            .ok_or_else(|| CatalogError::missing_field("spec"))?;
        let wpm = fields
            .get("wpm")
            .filter(|v| !v.is_null())
            .map(coerce_f64)
            .ok_or_else(|| CatalogError::missing_field("wpm"))?;

        let candidate = Self {
            spec,
            wpm,
            product: fields.get("product").map(coerce_string).unwrap_or_default(),
            method_calc: fields.get("method_calc").map(coerce_i64).unwrap_or(0),
            initial_length: fields.get("initial_length").map(coerce_f64).unwrap_or(0.0),
            trade_unit: fields.get("trade_unit").map(coerce_i64).unwrap_or(0),
            cat_product: fields.get("cat_product").map(coerce_i64).unwrap_or(0),
        };
        candidate.validate()?;
        Ok(candidate)
    }

    /// Validate required fields.
    pub fn validate(&self) -> CatalogResult<()> {
        if self.spec.trim().is_empty() {
            return Err(CatalogError::missing_field("spec"));
        }
        if !self.wpm.is_finite() {
            return Err(CatalogError::invalid_value("wpm", "must be a finite number"));
        }
        Ok(())
    }
}

/// A full or partial update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordChanges {
    pub spec: Option<String>,
    pub wpm: Option<f64>,
    pub product: Option<String>,
    pub method_calc: Option<i64>,
    pub initial_length: Option<f64>,
    pub trade_unit: Option<i64>,
    pub cat_product: Option<i64>,
}

impl RecordChanges {
    /// Create an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spec(mut self, spec: impl Into<String>) -> Self {
        self.spec = Some(spec.into());
        self
    }

    pub fn wpm(mut self, wpm: f64) -> Self {
        self.wpm = Some(wpm);
        self
    }

    pub fn product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    pub fn method_calc(mut self, method_calc: i64) -> Self {
        self.method_calc = Some(method_calc);
        self
    }

    pub fn initial_length(mut self, initial_length: f64) -> Self {
        self.initial_length = Some(initial_length);
        self
    }

    pub fn trade_unit(mut self, trade_unit: i64) -> Self {
        self.trade_unit = Some(trade_unit);
        self
    }

    pub fn cat_product(mut self, cat_product: i64) -> Self {
        self.cat_product = Some(cat_product);
        self
    }

    /// Parse a change set from loose JSON input.
    ///
    /// Only keys that are present are applied. Numeric values that cannot be
    /// parsed become their zero default rather than failing the update.
    pub fn from_json(input: &Value) -> CatalogResult<Self> {
        let fields = as_object(input)?;
        Ok(Self {
            spec: fields.get("spec").map(coerce_string),
            wpm: fields.get("wpm").map(coerce_f64),
            product: fields.get("product").map(coerce_string),
            method_calc: fields.get("method_calc").map(coerce_i64),
            initial_length: fields.get("initial_length").map(coerce_f64),
            trade_unit: fields.get("trade_unit").map(coerce_i64),
            cat_product: fields.get("cat_product").map(coerce_i64),
        })
    }

    /// Returns true if no field would change.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Validate the fields that are present.
    pub fn validate(&self) -> CatalogResult<()> {
        if let Some(spec) = &self.spec {
            if spec.trim().is_empty() {
                return Err(CatalogError::invalid_value("spec", "must not be empty"));
            }
        }
        for (field, value) in [("wpm", self.wpm), ("initial_length", self.initial_length)] {
            if matches!(value, Some(v) if !v.is_finite()) {
                return Err(CatalogError::invalid_value(field, "must be a finite number"));
            }
        }
        Ok(())
    }
}

fn as_object(input: &Value) -> CatalogResult<&Map<String, Value>> {
    input
        .as_object()
        .ok_or_else(|| CatalogError::invalid_value("body", "expected a JSON object"))
}
