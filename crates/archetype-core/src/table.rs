//! # Reference Tables
//!
//! A flat key → record map with provenance, shared by the envelope table
//! and every side table.
//!
//! Tables use `BTreeMap` so iteration, export and snapshots are
//! deterministic. Inserting an existing key replaces the record (last write
//! wins) and hands the previous entry back to the caller, which is how the
//! loader detects duplicate keys.

use crate::error::LookupError;
use crate::types::{ArchetypeRef, CalibrationStage, ScenarioKey, ScenarioRef, SourceRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// STAGED KEYS
// =============================================================================

/// Keys that carry a calibration stage.
///
/// Lets a table answer a lookup that does not name a stage by trying each
/// stage in [`CalibrationStage::RESOLUTION_ORDER`].
pub trait Staged: Ord + Clone + std::fmt::Display {
    /// The stage this key addresses.
    fn stage(&self) -> CalibrationStage;

    /// The same key at another stage.
    fn with_stage(&self, stage: CalibrationStage) -> Self;
}

impl Staged for ArchetypeRef {
    fn stage(&self) -> CalibrationStage {
        self.stage
    }

    fn with_stage(&self, stage: CalibrationStage) -> Self {
        Self {
            stage,
            ..self.clone()
        }
    }
}

impl Staged for ScenarioRef {
    fn stage(&self) -> CalibrationStage {
        self.stage
    }

    fn with_stage(&self, stage: CalibrationStage) -> Self {
        self.at_stage(stage)
    }
}

impl Staged for ScenarioKey {
    fn stage(&self) -> CalibrationStage {
        self.stage
    }

    fn with_stage(&self, stage: CalibrationStage) -> Self {
        Self {
            stage,
            ..self.clone()
        }
    }
}

// =============================================================================
// ENTRY
// =============================================================================

/// A record together with where it was defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry<V> {
    pub value: V,
    pub source: SourceRef,
}

// =============================================================================
// REFERENCE TABLE
// =============================================================================

/// Immutable-after-load reference table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTable<K: Ord, V> {
    /// Table name used in lookup errors.
    name: &'static str,
    entries: BTreeMap<K, Entry<V>>,
}

impl<K: Ord + Clone + std::fmt::Display, V> ReferenceTable<K, V> {
    /// Create an empty table.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: BTreeMap::new(),
        }
    }

    /// Table name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Insert a record, replacing any existing record for the key.
    ///
    /// Returns the replaced entry, if any.
    pub fn insert(&mut self, key: K, value: V, source: SourceRef) -> Option<Entry<V>> {
        self.entries.insert(key, Entry { value, source })
    }

    /// Exact lookup.
    pub fn get(&self, key: &K) -> Result<&V, LookupError> {
        self.entries
            .get(key)
            .map(|e| &e.value)
            .ok_or_else(|| LookupError::not_found(self.name, key))
    }

    /// Exact lookup including provenance.
    #[must_use]
    pub fn get_entry(&self, key: &K) -> Option<&Entry<V>> {
        self.entries.get(key)
    }

    /// Check if a key exists.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All keys (deterministic order).
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// All entries (deterministic order).
    pub fn iter(&self) -> impl Iterator<Item = (&K, &Entry<V>)> {
        self.entries.iter()
    }

    /// Mutable access for crate-internal derivations (overrides).
    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = (&K, &mut Entry<V>)> {
        self.entries.iter_mut()
    }
}

impl<K: Staged, V> ReferenceTable<K, V> {
    /// Lookup that falls back across calibration stages.
    ///
    /// The stage on `key` is ignored; stages are tried in resolution order
    /// and the first hit wins. The error reports the key as given.
    pub fn resolve(&self, key: &K) -> Result<&V, LookupError> {
        self.resolve_entry(key)
            .map(|(_, e)| &e.value)
            .ok_or_else(|| LookupError::not_found(self.name, key))
    }

    /// Like [`resolve`](Self::resolve), returning the matched key and entry.
    #[must_use]
    pub fn resolve_entry(&self, key: &K) -> Option<(&K, &Entry<V>)> {
        CalibrationStage::RESOLUTION_ORDER
            .into_iter()
            .find_map(|stage| self.entries.get_key_value(&key.with_stage(stage)))
    }
}

// =============================================================================
// TESTS
// =============================================================================
