//! Error types for catalog operations

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Persistent store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Store conflict: {reason}")]
    Conflict { reason: String },
}

/// Input validation errors raised before any store call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid bulk selector: {reason}")]
    InvalidSelector { reason: String },
}

/// Master error type for all catalog errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Record not found: {key}")]
    NotFound { key: String },

    #[error("Duplicate spec: {spec} already exists")]
    DuplicateSpec { spec: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl CatalogError {
    /// Create a NotFound error for the given lookup key.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a DuplicateSpec error.
    pub fn duplicate_spec(spec: impl Into<String>) -> Self {
        Self::DuplicateSpec { spec: spec.into() }
    }

    /// Create a StoreUnavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Store(StoreError::Unavailable {
            reason: reason.into(),
        })
    }

    /// Create a store-level Conflict error.
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Store(StoreError::Conflict {
            reason: reason.into(),
        })
    }

    /// Create an InvalidValue validation error.
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation(ValidationError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// Create a RequiredFieldMissing validation error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::Validation(ValidationError::RequiredFieldMissing {
            field: field.into(),
        })
    }

    /// Create an InvalidSelector validation error.
    pub fn invalid_selector(reason: impl Into<String>) -> Self {
        Self::Validation(ValidationError::InvalidSelector {
            reason: reason.into(),
        })
    }

    /// The coarse kind of this error, for protocol status mapping.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::NotFound { .. } => ErrorKind::NotFound,
            CatalogError::DuplicateSpec { .. } => ErrorKind::DuplicateSpec,
            CatalogError::Validation(_) => ErrorKind::InvalidArgument,
            CatalogError::Store(StoreError::Unavailable { .. }) => ErrorKind::StoreUnavailable,
            CatalogError::Store(StoreError::Conflict { .. }) => ErrorKind::Conflict,
        }
    }
}

/// Error kinds exposed to the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Lookup, update or delete target is absent
    NotFound,
    /// Create (or spec-changing update) with a spec that already exists
    DuplicateSpec,
    /// Malformed input
    InvalidArgument,
    /// Store I/O failure (timeout, connection loss)
    StoreUnavailable,
    /// Store-detected race on a unique constraint
    Conflict,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Result type alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

// =============================================================================
// TESTS
// =============================================================================
