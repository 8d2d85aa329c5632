//! # Errors
//!
//! Lookup misses are the only runtime failure of the tables. Everything else
//! here concerns reading datasets, snapshots and override rules.

use thiserror::Error;

/// A composite key absent from a table.
///
/// Coverage of the reference data is irregular (not every archetype has every
/// era), so a miss is an expected outcome rather than a fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("no {table} entry for {key}")]
    NotFound { table: &'static str, key: String },
}

impl LookupError {
    pub(crate) fn not_found(table: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            table,
            key: key.to_string(),
        }
    }
}

/// Errors raised while reading or decoding datasets.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("unknown component: {0}")]
    UnknownComponent(String),

    #[error("unknown calibration stage: {0}")]
    UnknownStage(String),

    #[error("unknown pick strategy: {0}")]
    UnknownStrategy(String),

    #[error("unknown issue kind: {0}")]
    UnknownIssueKind(String),

    #[error("embedded dataset unreadable: {0}")]
    Embedded(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] postcard::Error),

    #[error("dataset is neither a snapshot nor UTF-8 JSON")]
    UnrecognizedFormat,

    #[error("snapshot too short: {0} bytes")]
    Truncated(usize),

    #[error("not a snapshot (bad magic)")]
    InvalidMagic,

    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u8),

    #[error("snapshot checksum mismatch: expected {expected:016x}, found {actual:016x}")]
    ChecksumMismatch { expected: u64, actual: u64 },
}

/// Errors raised by invalid override rules.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OverrideError {
    #[error("rule {index}: no fixed_value, min_val or max_val given")]
    MissingValue { index: usize },

    #[error("rule {index}: area_m2 only accepts fixed_value")]
    AreaRange { index: usize },

    #[error("rule {index}: area_m2 must be positive, got {value}")]
    NonPositiveArea { index: usize, value: f64 },

    #[error("rule {index}: r_value override on {component}, which has no resistance")]
    NoResistance { index: usize, component: String },
}

/// Umbrella error for callers that mix operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Override(#[from] OverrideError),
}

/// Result alias for dataset operations.
pub type DataResult<T> = Result<T, DataError>;
