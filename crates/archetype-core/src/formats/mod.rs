//! # Formats Module
//!
//! Serialization of the reference tables.
//!
//! This module contains:
//! - JSON interchange (one flat object per envelope record)
//! - Canonical binary snapshot (postcard + header)
//! - Format detection for datasets supplied at runtime
//!
//! File I/O stays in the app layer (apps/archetype). This module only
//! converts between bytes and tables.

mod interchange;
mod snapshot;

pub use interchange::*;
pub use snapshot::*;

use crate::dataset::{ReferenceData, SourceDocument};
use crate::error::{DataError, DataResult};
use crate::validation::ValidationConfig;

/// Load a dataset in any supported format.
///
/// Snapshots are recognized by their magic. Anything else must be UTF-8
/// JSON: source documents first, then interchange records. A snapshot keeps
/// the tolerances it was written with and ignores `config`.
pub fn load_dataset(bytes: &[u8], config: ValidationConfig) -> DataResult<ReferenceData> {
    if is_snapshot(bytes) {
        return decode_snapshot(bytes);
    }
    let json = std::str::from_utf8(bytes).map_err(|_| DataError::UnrecognizedFormat)?;
    match SourceDocument::parse_all(json) {
        Ok(documents) => Ok(ReferenceData::from_documents(&documents, config)),
        Err(documents_err) => match records_from_json(json) {
            Ok(records) => Ok(ReferenceData::from_interchange(&records, config)),
            Err(_) => Err(documents_err),
        },
    }
}
