//! JSON interchange: one flat object per envelope record.

use crate::dataset::{Loader, ReferenceData};
use crate::envelope::EnvelopeTable;
use crate::error::DataResult;
use crate::types::{CalibrationStage, Component, EnvelopeRecord, ScenarioKey, SourceRef, ValueRange};
use crate::validation::{DataIssue, IssueKind, ValidationConfig};
use serde::{Deserialize, Serialize};

/// Source name given to records read from interchange JSON.
pub const INTERCHANGE_SOURCE: &str = "interchange";

/// Flat, self-describing form of one envelope record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterchangeRecord {
    pub archetype: String,
    pub era: String,
    pub scenario: String,
    #[serde(default)]
    pub calibration_stage: CalibrationStage,
    pub component: Component,
    pub area_m2: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r_value_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r_value_max: Option<f64>,
    pub u_value_min: f64,
    pub u_value_max: f64,
}

impl InterchangeRecord {
    #[must_use]
    pub fn new(key: &ScenarioKey, record: &EnvelopeRecord) -> Self {
        Self {
            archetype: key.archetype.clone(),
            era: key.era.clone(),
            scenario: key.scenario.clone(),
            calibration_stage: key.stage,
            component: key.component,
            area_m2: record.area_m2,
            r_value_min: record.r_value_range.map(|r| r.min),
            r_value_max: record.r_value_range.map(|r| r.max),
            u_value_min: record.u_value_range.min,
            u_value_max: record.u_value_range.max,
        }
    }

    /// The composite key, taken field by field.
    #[must_use]
    pub fn key(&self) -> ScenarioKey {
        ScenarioKey::new(
            self.archetype.clone(),
            self.era.clone(),
            self.scenario.clone(),
            self.calibration_stage,
            self.component,
        )
    }

    /// The envelope values. A lone R bound reads as a fixed range.
    #[must_use]
    pub fn record(&self) -> EnvelopeRecord {
        let r_value_range = match (self.r_value_min, self.r_value_max) {
            (Some(min), Some(max)) => Some(ValueRange::new(min, max)),
            (Some(value), None) | (None, Some(value)) => Some(ValueRange::fixed(value)),
            (None, None) => None,
        };
        EnvelopeRecord::new(
            self.area_m2,
            r_value_range,
            ValueRange::new(self.u_value_min, self.u_value_max),
        )
    }
}

/// Every envelope record in table order.
#[must_use]
pub fn export_records(table: &EnvelopeTable) -> Vec<InterchangeRecord> {
    table
        .iter()
        .map(|(key, entry)| InterchangeRecord::new(key, &entry.value))
        .collect()
}

/// Pretty-printed JSON array.
pub fn records_to_json(records: &[InterchangeRecord]) -> DataResult<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

pub fn records_from_json(json: &str) -> DataResult<Vec<InterchangeRecord>> {
    Ok(serde_json::from_str(json)?)
}

impl ReferenceData {
    /// Load interchange records; the line of each is its 1-based position.
    ///
    /// Keys are used as written, so free-form eras and scenarios survive.
    #[must_use]
    pub fn from_interchange(records: &[InterchangeRecord], config: ValidationConfig) -> Self {
        let mut loader = Loader::new(config);
        for (record, line) in records.iter().zip(1u32..) {
            let origin = SourceRef::new(INTERCHANGE_SOURCE, line);
            let key = record.key();
            if record.r_value_min.is_some() != record.r_value_max.is_some() {
                loader.report(
                    DataIssue::new(
                        IssueKind::RangeArity,
                        origin.clone(),
                        "R_value_range has 1 value, read as a fixed range",
                    )
                    .with_key(&key),
                );
            }
            loader.load_record(key, record.record(), origin);
        }
        loader.finish()
    }
}
