//! # Overrides
//!
//! User rules that replace envelope values for matching records.
//!
//! Overrides never touch the loaded tables: [`ReferenceData::with_overrides`]
//! returns a new dataset. Overridden records carry an `overrides` source
//! pointing at the rule that last changed them.

use crate::dataset::ReferenceData;
use crate::error::{DataResult, OverrideError};
use crate::types::{CalibrationStage, Component, EnvelopeRecord, ScenarioKey, SourceRef, ValueRange};
use crate::validation::validate_table;
use serde::{Deserialize, Serialize};

/// Source name given to overridden records.
pub const OVERRIDE_SOURCE: &str = "overrides";

/// The value a rule replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverrideParam {
    #[serde(rename = "area_m2")]
    Area,
    #[serde(rename = "r_value")]
    RValue,
    #[serde(rename = "u_value")]
    UValue,
}

/// One override rule.
///
/// Filters left out match everything. `fixed_value` wins over
/// `min_val`/`max_val`; a single bound replaces only that bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archetype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub era: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration_stage: Option<CalibrationStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<Component>,
    #[serde(rename = "param_name", alias = "param")]
    pub param: OverrideParam,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_val: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_val: Option<f64>,
}

impl OverrideRule {
    /// A rule that sets `param` to a fixed value everywhere.
    #[must_use]
    pub fn fixed(param: OverrideParam, value: f64) -> Self {
        Self {
            archetype: None,
            era: None,
            scenario: None,
            calibration_stage: None,
            component: None,
            param,
            fixed_value: Some(value),
            min_val: None,
            max_val: None,
        }
    }

    #[must_use]
    pub fn for_archetype(mut self, archetype: impl Into<String>) -> Self {
        self.archetype = Some(archetype.into());
        self
    }

    #[must_use]
    pub fn for_component(mut self, component: Component) -> Self {
        self.component = Some(component);
        self
    }

    /// Check the rule on its own; `index` is its position in the list.
    pub fn validate(&self, index: usize) -> Result<(), OverrideError> {
        if self.fixed_value.is_none() && self.min_val.is_none() && self.max_val.is_none() {
            return Err(OverrideError::MissingValue { index });
        }
        match self.param {
            OverrideParam::Area => {
                if self.min_val.is_some() || self.max_val.is_some() {
                    return Err(OverrideError::AreaRange { index });
                }
                if let Some(value) = self.fixed_value
                    && (value.is_nan() || value <= 0.0)
                {
                    return Err(OverrideError::NonPositiveArea { index, value });
                }
            }
            OverrideParam::RValue => {
                if let Some(component) = self.component
                    && !component.is_opaque()
                {
                    return Err(OverrideError::NoResistance {
                        index,
                        component: component.to_string(),
                    });
                }
            }
            OverrideParam::UValue => {}
        }
        Ok(())
    }

    /// Check if the rule's filters select a key.
    #[must_use]
    pub fn matches(&self, key: &ScenarioKey) -> bool {
        fn accepts<T: PartialEq + ?Sized>(filter: Option<&T>, value: &T) -> bool {
            filter.is_none_or(|f| f == value)
        }
        accepts(self.archetype.as_deref(), key.archetype.as_str())
            && accepts(self.era.as_deref(), key.era.as_str())
            && accepts(self.scenario.as_deref(), key.scenario.as_str())
            && accepts(self.calibration_stage.as_ref(), &key.stage)
            && accepts(self.component.as_ref(), &key.component)
    }

    /// Apply to one record. Returns whether the record changed.
    fn apply(&self, component: Component, record: &mut EnvelopeRecord) -> bool {
        let before = record.clone();
        match self.param {
            OverrideParam::Area => {
                if let Some(value) = self.fixed_value {
                    record.area_m2 = value;
                }
            }
            OverrideParam::UValue => {
                if let Some(range) = self.range_over(Some(record.u_value_range)) {
                    record.u_value_range = range;
                }
            }
            OverrideParam::RValue => {
                if component.is_opaque() {
                    record.r_value_range =
                        self.range_over(record.r_value_range).or(record.r_value_range);
                }
            }
        }
        *record != before
    }

    fn range_over(&self, base: Option<ValueRange>) -> Option<ValueRange> {
        if let Some(value) = self.fixed_value {
            return Some(ValueRange::fixed(value));
        }
        match base {
            Some(base) => Some(ValueRange::new(
                self.min_val.unwrap_or(base.min),
                self.max_val.unwrap_or(base.max),
            )),
            None => {
                let min = self.min_val.or(self.max_val)?;
                let max = self.max_val.or(self.min_val)?;
                Some(ValueRange::new(min, max))
            }
        }
    }
}

/// An ordered list of rules; later rules win.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverrideSet {
    pub rules: Vec<OverrideRule>,
}

impl OverrideSet {
    #[must_use]
    pub fn new(rules: Vec<OverrideRule>) -> Self {
        Self { rules }
    }

    /// Parse a JSON array of rules.
    pub fn from_json_str(json: &str) -> DataResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check every rule, failing on the first invalid one.
    pub fn validate(&self) -> Result<(), OverrideError> {
        self.rules
            .iter()
            .enumerate()
            .try_for_each(|(index, rule)| rule.validate(index))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl ReferenceData {
    /// A copy of the dataset with the override rules applied.
    ///
    /// Record checks are re-run on the result; load-time structural findings
    /// are carried over unchanged.
    pub fn with_overrides(&self, overrides: &OverrideSet) -> Result<ReferenceData, OverrideError> {
        overrides.validate()?;

        let mut data = self.clone();
        for (key, entry) in data.envelope.values_mut() {
            for (index, rule) in overrides.rules.iter().enumerate() {
                if rule.matches(key) && rule.apply(key.component, &mut entry.value) {
                    entry.source = SourceRef::new(OVERRIDE_SOURCE, rule_line(index));
                }
            }
        }

        data.issues.retain(|issue| !issue.kind.is_record_check());
        data.issues.extend(validate_table(&data.envelope, &data.config));
        Ok(data)
    }
}

/// 1-based rule position, as a provenance line.
fn rule_line(index: usize) -> u32 {
    u32::try_from(index).map_or(u32::MAX, |i| i.saturating_add(1))
}

// =============================================================================
// TESTS
// =============================================================================
