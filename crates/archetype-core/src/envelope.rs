//! # Envelope Table
//!
//! The building-envelope lookup: one [`EnvelopeRecord`] per
//! (archetype, era, scenario, stage, component).

use crate::error::LookupError;
use crate::table::ReferenceTable;
use crate::types::{CalibrationStage, Component, EnvelopeRecord, ScenarioKey, ScenarioRef};
use std::collections::BTreeSet;

/// Table name used in lookup errors.
pub const ENVELOPE_TABLE: &str = "envelope";

/// The envelope lookup table.
pub type EnvelopeTable = ReferenceTable<ScenarioKey, EnvelopeRecord>;

impl EnvelopeTable {
    /// Create an empty envelope table.
    #[must_use]
    pub fn envelope() -> Self {
        Self::new(ENVELOPE_TABLE)
    }

    /// Look up one component of one scenario.
    ///
    /// Archetype, era and scenario match exactly. The calibration stage is
    /// resolved in [`CalibrationStage::RESOLUTION_ORDER`], so both the 3-part
    /// and the 4-part addressing schemes answer a 4-part query.
    pub fn get_envelope(
        &self,
        archetype: &str,
        era: &str,
        scenario: &str,
        component: Component,
    ) -> Result<&EnvelopeRecord, LookupError> {
        let key = ScenarioKey::new(
            archetype,
            era,
            scenario,
            CalibrationStage::Unstaged,
            component,
        );
        self.resolve_entry(&key)
            .map(|(_, e)| &e.value)
            .ok_or_else(|| {
                LookupError::not_found(
                    ENVELOPE_TABLE,
                    format!("({archetype}, {era}, {scenario}, {component})"),
                )
            })
    }

    /// All components recorded for one scenario at its exact stage.
    ///
    /// Returns `NotFound` when the scenario has no components at all.
    pub fn scenario_envelope(
        &self,
        scenario: &ScenarioRef,
    ) -> Result<Vec<(Component, &EnvelopeRecord)>, LookupError> {
        let records: Vec<_> = Component::ALL
            .into_iter()
            .filter_map(|c| self.get(&scenario.component(c)).ok().map(|r| (c, r)))
            .collect();
        if records.is_empty() {
            return Err(LookupError::not_found(ENVELOPE_TABLE, scenario));
        }
        Ok(records)
    }

    /// Resolve the stage of a scenario the way [`get_envelope`](Self::get_envelope) does.
    ///
    /// Returns the stage-qualified scenario that holds at least one component.
    pub fn resolve_scenario(&self, scenario: &ScenarioRef) -> Result<ScenarioRef, LookupError> {
        CalibrationStage::RESOLUTION_ORDER
            .into_iter()
            .map(|stage| scenario.at_stage(stage))
            .find(|s| {
                Component::ALL
                    .into_iter()
                    .any(|c| self.contains(&s.component(c)))
            })
            .ok_or_else(|| LookupError::not_found(ENVELOPE_TABLE, scenario))
    }

    /// Distinct archetype names.
    #[must_use]
    pub fn archetypes(&self) -> Vec<&str> {
        self.keys()
            .map(|k| k.archetype.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct eras recorded for an archetype.
    #[must_use]
    pub fn eras(&self, archetype: &str) -> Vec<&str> {
        self.keys()
            .filter(|k| k.archetype == archetype)
            .map(|k| k.era.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct stage-qualified scenarios of an (archetype, era).
    #[must_use]
    pub fn scenarios(&self, archetype: &str, era: &str) -> Vec<ScenarioRef> {
        self.keys()
            .filter(|k| k.archetype == archetype && k.era == era)
            .map(ScenarioKey::scenario_ref)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
