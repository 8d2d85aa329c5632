//! # Core Types
//!
//! Keys, components, ranges and records shared by every table.
//!
//! Keys are plain strings matched exactly: the reference data spells the same
//! archetype in more than one way ("Corner Townhouse" / "Corner townhouse")
//! and those spellings address different records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DataError;

// =============================================================================
// COMPONENT
// =============================================================================

/// A building-envelope component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    GroundFloor,
    SolidWall,
    SlopingFlatRoof,
    Windows,
    Doors,
}

impl Component {
    /// All components in table order.
    pub const ALL: [Component; 5] = [
        Component::GroundFloor,
        Component::SolidWall,
        Component::SlopingFlatRoof,
        Component::Windows,
        Component::Doors,
    ];

    /// The identifier used in the source data.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GroundFloor => "ground_floor",
            Self::SolidWall => "solid_wall",
            Self::SlopingFlatRoof => "sloping_flat_roof",
            Self::Windows => "windows",
            Self::Doors => "doors",
        }
    }

    /// Opaque components carry a thermal resistance next to the transmittance.
    #[must_use]
    pub fn is_opaque(self) -> bool {
        matches!(
            self,
            Self::GroundFloor | Self::SolidWall | Self::SlopingFlatRoof
        )
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Component {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| DataError::UnknownComponent(s.to_string()))
    }
}

// =============================================================================
// CALIBRATION STAGE
// =============================================================================

/// Calibration stage discriminator of a key.
///
/// `Unstaged` is the 3-part addressing scheme, where the source omits the
/// stage level entirely.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStage {
    #[default]
    Unstaged,
    PreCalibration,
    PostCalibration,
}

impl CalibrationStage {
    /// Order in which a 4-part lookup tries the stages.
    pub const RESOLUTION_ORDER: [CalibrationStage; 3] = [
        CalibrationStage::Unstaged,
        CalibrationStage::PreCalibration,
        CalibrationStage::PostCalibration,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unstaged => "unstaged",
            Self::PreCalibration => "pre_calibration",
            Self::PostCalibration => "post_calibration",
        }
    }
}

impl fmt::Display for CalibrationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalibrationStage {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unstaged" | "" => Ok(Self::Unstaged),
            "pre_calibration" => Ok(Self::PreCalibration),
            "post_calibration" => Ok(Self::PostCalibration),
            other => Err(DataError::UnknownStage(other.to_string())),
        }
    }
}

// =============================================================================
// KEYS
// =============================================================================

/// (archetype, era, stage): addresses per-dwelling characteristics.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ArchetypeRef {
    pub archetype: String,
    pub era: String,
    pub stage: CalibrationStage,
}

impl ArchetypeRef {
    #[must_use]
    pub fn new(
        archetype: impl Into<String>,
        era: impl Into<String>,
        stage: CalibrationStage,
    ) -> Self {
        Self {
            archetype: archetype.into(),
            era: era.into(),
            stage,
        }
    }
}

impl fmt::Display for ArchetypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.archetype, self.era, self.stage)
    }
}

/// (archetype, era, scenario, stage): addresses one retrofit scenario.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScenarioRef {
    pub archetype: String,
    pub era: String,
    pub scenario: String,
    pub stage: CalibrationStage,
}

impl ScenarioRef {
    #[must_use]
    pub fn new(
        archetype: impl Into<String>,
        era: impl Into<String>,
        scenario: impl Into<String>,
        stage: CalibrationStage,
    ) -> Self {
        Self {
            archetype: archetype.into(),
            era: era.into(),
            scenario: scenario.into(),
            stage,
        }
    }

    /// Same scenario at a different stage.
    #[must_use]
    pub fn at_stage(&self, stage: CalibrationStage) -> Self {
        Self {
            stage,
            ..self.clone()
        }
    }

    /// Extend with a component into a full envelope key.
    #[must_use]
    pub fn component(&self, component: Component) -> ScenarioKey {
        ScenarioKey {
            archetype: self.archetype.clone(),
            era: self.era.clone(),
            scenario: self.scenario.clone(),
            stage: self.stage,
            component,
        }
    }
}

impl fmt::Display for ScenarioRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.archetype, self.era, self.scenario, self.stage
        )
    }
}

/// Full composite key of one envelope record.
///
/// Field order is the ordering used by every table, so iteration groups
/// records by archetype, then era, scenario, stage and component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ScenarioKey {
    pub archetype: String,
    pub era: String,
    pub scenario: String,
    pub stage: CalibrationStage,
    pub component: Component,
}

impl ScenarioKey {
    #[must_use]
    pub fn new(
        archetype: impl Into<String>,
        era: impl Into<String>,
        scenario: impl Into<String>,
        stage: CalibrationStage,
        component: Component,
    ) -> Self {
        Self {
            archetype: archetype.into(),
            era: era.into(),
            scenario: scenario.into(),
            stage,
            component,
        }
    }

    /// Drop the component.
    #[must_use]
    pub fn scenario_ref(&self) -> ScenarioRef {
        ScenarioRef {
            archetype: self.archetype.clone(),
            era: self.era.clone(),
            scenario: self.scenario.clone(),
            stage: self.stage,
        }
    }
}

impl fmt::Display for ScenarioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {}, {})",
            self.archetype, self.era, self.scenario, self.stage, self.component
        )
    }
}

// =============================================================================
// VALUE RANGE
// =============================================================================

/// How a range collapses to a single value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickStrategy {
    #[default]
    Midpoint,
    Lower,
    Upper,
}

impl FromStr for PickStrategy {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "midpoint" | "mid" => Ok(Self::Midpoint),
            "lower" | "min" => Ok(Self::Lower),
            "upper" | "max" => Ok(Self::Upper),
            other => Err(DataError::UnknownStrategy(other.to_string())),
        }
    }
}

/// A (min, max) pair exactly as written in the source.
///
/// The pair is never re-ordered: U-value ranges are often written
/// "worst first", so `min > max` is a legitimate reading of the data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// A degenerate range holding one value.
    #[must_use]
    pub fn fixed(value: f64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    #[must_use]
    pub fn is_fixed(&self) -> bool {
        self.min == self.max
    }

    #[must_use]
    pub fn is_inverted(&self) -> bool {
        self.min > self.max
    }

    /// Bounds in written order.
    #[must_use]
    pub fn bounds(&self) -> [f64; 2] {
        [self.min, self.max]
    }

    /// Collapse to a single value.
    #[must_use]
    pub fn pick(&self, strategy: PickStrategy) -> f64 {
        if self.is_fixed() {
            return self.min;
        }
        match strategy {
            PickStrategy::Midpoint => (self.min + self.max) / 2.0,
            PickStrategy::Lower => self.min,
            PickStrategy::Upper => self.max,
        }
    }
}

impl fmt::Display for ValueRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.min, self.max)
    }
}

// =============================================================================
// ENVELOPE RECORD
// =============================================================================

/// Performance data for one component of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeRecord {
    /// Surface area in m².
    pub area_m2: f64,
    /// Thermal resistance in m²·K/W; opaque components only.
    pub r_value_range: Option<ValueRange>,
    /// Thermal transmittance in W/m²·K.
    pub u_value_range: ValueRange,
}

impl EnvelopeRecord {
    #[must_use]
    pub fn new(area_m2: f64, r_value_range: Option<ValueRange>, u_value_range: ValueRange) -> Self {
        Self {
            area_m2,
            r_value_range,
            u_value_range,
        }
    }

    /// Collapse both ranges with one strategy.
    #[must_use]
    pub fn pick(&self, strategy: PickStrategy) -> PickedValues {
        PickedValues {
            strategy,
            r_value: self.r_value_range.map(|r| r.pick(strategy)),
            u_value: self.u_value_range.pick(strategy),
        }
    }
}

/// Single values taken from a record's ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickedValues {
    pub strategy: PickStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_value: Option<f64>,
    pub u_value: f64,
}

// =============================================================================
// PROVENANCE
// =============================================================================

/// Where a value was written in the source documents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    /// Document identifier (e.g. `building_envelope`).
    pub source: String,
    /// 1-based line of the entry in the original source file.
    pub line: u32,
}

impl SourceRef {
    #[must_use]
    pub fn new(source: impl Into<String>, line: u32) -> Self {
        Self {
            source: source.into(),
            line,
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.line)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_parse_round_trips_names() {
        for component in Component::ALL {
            assert_eq!(component.as_str().parse::<Component>().ok(), Some(component));
        }
        assert!("roof".parse::<Component>().is_err());
    }

    #[test]
    fn opaque_components() {
        assert!(Component::SolidWall.is_opaque());
        assert!(Component::SlopingFlatRoof.is_opaque());
        assert!(!Component::Windows.is_opaque());
        assert!(!Component::Doors.is_opaque());
    }

    #[test]
    fn stage_parse() {
        assert_eq!(
            "pre_calibration".parse::<CalibrationStage>().ok(),
            Some(CalibrationStage::PreCalibration)
        );
        assert_eq!(
            "".parse::<CalibrationStage>().ok(),
            Some(CalibrationStage::Unstaged)
        );
        assert!("calibrated".parse::<CalibrationStage>().is_err());
    }

    #[test]
    fn range_pick_strategies() {
        let range = ValueRange::new(2.0, 3.0);
        assert_eq!(range.pick(PickStrategy::Midpoint), 2.5);
        assert_eq!(range.pick(PickStrategy::Lower), 2.0);
        assert_eq!(range.pick(PickStrategy::Upper), 3.0);

        let fixed = ValueRange::fixed(1.4);
        assert_eq!(fixed.pick(PickStrategy::Upper), 1.4);
        assert!(fixed.is_fixed());
    }

    #[test]
    fn record_pick_covers_both_ranges() {
        let wall = EnvelopeRecord::new(
            80.0,
            Some(ValueRange::new(1.0, 2.0)),
            ValueRange::new(0.8, 0.4),
        );
        let picked = wall.pick(PickStrategy::Upper);
        assert_eq!(picked.r_value, Some(2.0));
        assert_eq!(picked.u_value, 0.4);

        let door = EnvelopeRecord::new(2.0, None, ValueRange::fixed(1.4));
        assert_eq!(door.pick(PickStrategy::Midpoint).r_value, None);
    }

    #[test]
    fn inverted_range_is_kept_as_written() {
        let range = ValueRange::new(3.4, 1.4);
        assert!(range.is_inverted());
        assert_eq!(range.bounds(), [3.4, 1.4]);
        assert_eq!(range.pick(PickStrategy::Lower), 3.4);
    }

    #[test]
    fn keys_order_by_archetype_first() {
        let a = ScenarioKey::new(
            "A",
            "2000",
            "scenario2",
            CalibrationStage::Unstaged,
            Component::Doors,
        );
        let b = ScenarioKey::new(
            "B",
            "1900",
            "scenario1",
            CalibrationStage::Unstaged,
            Component::GroundFloor,
        );
        assert!(a < b);
    }

    #[test]
    fn scenario_ref_extends_to_key() {
        let scenario = ScenarioRef::new(
            "A",
            "<1946",
            "scenario1",
            CalibrationStage::PreCalibration,
        );
        let key = scenario.component(Component::Windows);
        assert_eq!(key.scenario_ref(), scenario);
        assert_eq!(key.to_string(), "(A, <1946, scenario1, pre_calibration, windows)");
    }
}
