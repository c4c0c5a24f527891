// In: src/error.rs

//! This module defines the single, unified error type for the entire sstable-arrow library.
//! It uses the `thiserror` crate to provide ergonomic, context-aware error handling.
//!
//! Every error is terminal for the file being decoded: byte-level SSTable
//! components offer no reliable resynchronisation point.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SstableError {
    // =========================================================================
    // === Byte-Level Errors (cursor and varint codec)
    // =========================================================================
    #[error("Truncated input: needed {needed} byte(s) at offset {offset}, only {remaining} remaining")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("Malformed variable-width integer at offset {offset}: {reason}")]
    MalformedVarint { offset: usize, reason: String },

    #[error("Invalid UTF-8 text block at offset {offset}")]
    InvalidText { offset: usize },

    // =========================================================================
    // === Statistics Errors
    // =========================================================================
    #[error("Statistics section not found: {0}")]
    UnknownSection(String),

    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    // =========================================================================
    // === Data / Index Errors
    // =========================================================================
    #[error("Data file disagrees with the statistics schema: {0}")]
    SchemaMismatch(String),

    #[error("Malformed row at offset {offset}: {reason}")]
    MalformedRow { offset: usize, reason: String },

    #[error("Index offset {expected} does not match data position {actual}")]
    IndexMismatch { expected: u64, actual: u64 },

    // =========================================================================
    // === Projection Errors
    // =========================================================================
    #[error("Type coercion failed for column '{column}': {reason}")]
    TypeCoercion { column: String, reason: String },

    #[error("Decoding cancelled after {partitions} partition(s)")]
    Cancelled { partitions: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // =========================================================================
    // === External Error Wrappers (Using #[from] for automatic conversion)
    // =========================================================================
    /// An error originating from the Arrow library.
    #[error("Arrow operation failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// An error originating from the underlying I/O subsystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An error from the Serde JSON library, typically while loading a config.
    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// An error for Python FFI operations.
    #[cfg(feature = "python")]
    #[error("FFI operation failed: {0}")]
    FfiError(String),

    #[error("Internal logic error (this is a bug): {0}")]
    InternalError(String),
}

impl SstableError {
    pub(crate) fn malformed_row(offset: usize, reason: impl Into<String>) -> Self {
        SstableError::MalformedRow {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn coercion(column: &str, reason: impl Into<String>) -> Self {
        SstableError::TypeCoercion {
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// === Manual `From` Implementations ===
// =============================================================================

#[cfg(feature = "python")]
impl From<pyo3::PyErr> for SstableError {
    fn from(err: pyo3::PyErr) -> Self {
        SstableError::FfiError(err.to_string())
    }
}

#[cfg(feature = "python")]
impl From<SstableError> for pyo3::PyErr {
    fn from(err: SstableError) -> pyo3::PyErr {
        pyo3::exceptions::PyValueError::new_err(err.to_string())
    }
}
