//! Identity types and key dispatch for catalog records

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{CatalogError, CatalogResult};

/// Number of hex digits in the textual form of a [`RecordId`].
pub const RECORD_ID_LEN: usize = 32;

static ID_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-fA-F]{32}$").expect("Invalid record id regex"));

/// Returns true if `key` looks like a record id (exactly 32 hex digits).
///
/// This is the only rule used to tell ids and specs apart. A spec that happens
/// to consist of 32 hex digits is always treated as an id.
pub fn is_id_shaped(key: &str) -> bool {
    ID_SHAPE.is_match(key)
}

/// Store-assigned record identifier.
///
/// Backed by a UUIDv7, so ids sort by creation time. The textual form is the
/// 32-digit lowercase "simple" encoding, which [`is_id_shaped`] recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(#[serde(with = "uuid::serde::simple")] Uuid);

impl RecordId {
    /// Wrap an existing UUID.
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a new timestamp-sortable id.
    pub fn now_v7() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RecordId {
    type Err = CatalogError;

    fn from_str(s: &str) -> CatalogResult<Self> {
        if !is_id_shaped(s) {
            return Err(CatalogError::invalid_value(
                "id",
                format!("expected {} hex digits, got {:?}", RECORD_ID_LEN, s),
            ));
        }
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| CatalogError::invalid_value("id", e.to_string()))
    }
}

/// A lookup key: either a record id or a spec string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Id(RecordId),
    Spec(String),
}

impl RecordKey {
    /// Classify a raw key by shape: id-shaped tokens become [`RecordKey::Id`],
    /// everything else is a spec.
    pub fn parse(raw: &str) -> Self {
        if is_id_shaped(raw) {
            if let Ok(id) = raw.parse::<RecordId>() {
                return RecordKey::Id(id);
            }
        }
        RecordKey::Spec(raw.to_string())
    }

    /// Returns true if this key addresses a record by id.
    pub fn is_id(&self) -> bool {
        matches!(self, RecordKey::Id(_))
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Id(id) => write!(f, "{}", id),
            RecordKey::Spec(spec) => write!(f, "{}", spec),
        }
    }
}
