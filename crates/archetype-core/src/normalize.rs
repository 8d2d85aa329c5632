//! # Key Normalization
//!
//! Turns the raw key paths of the source documents into typed keys.
//!
//! The documents address records in more than one way: 3-part paths
//! `[archetype, era, scenario]`, 4-part paths with a calibration stage, and
//! irregular paths where an archetype is nested inside another archetype or
//! inside an era. Each segment is classified on its own:
//!
//! - `scenario<N>` is a scenario
//! - `*_calibration` is a calibration stage
//! - a year or year range, optionally prefixed by `<`, `>`, `Before ` or
//!   `After `, is an era
//! - anything else is an archetype
//!
//! The innermost archetype and era win. Paths that deviate from the regular
//! shape still normalize but are flagged as irregular.

use crate::types::{ArchetypeRef, CalibrationStage, ScenarioRef};
use std::fmt;

// =============================================================================
// SEGMENT CLASSIFICATION
// =============================================================================

/// What a single path segment denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Archetype,
    Era,
    Scenario,
    Stage,
}

/// Prefixes that may precede a year in an era label.
const ERA_PREFIXES: [&str; 6] = ["<", ">", "Before ", "After ", "before ", "after "];

/// Classify one path segment.
#[must_use]
pub fn classify_segment(segment: &str) -> SegmentKind {
    if is_scenario(segment) {
        SegmentKind::Scenario
    } else if segment.ends_with("_calibration") {
        SegmentKind::Stage
    } else if is_era(segment) {
        SegmentKind::Era
    } else {
        SegmentKind::Archetype
    }
}

fn is_scenario(segment: &str) -> bool {
    segment
        .strip_prefix("scenario")
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

fn is_year(s: &str) -> bool {
    s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_era(segment: &str) -> bool {
    let body = ERA_PREFIXES
        .iter()
        .find_map(|p| segment.strip_prefix(p))
        .unwrap_or(segment)
        .trim();
    match body.split_once('-') {
        Some((from, to)) => is_year(from.trim()) && is_year(to.trim()),
        None => is_year(body),
    }
}

// =============================================================================
// NORMALIZED PATHS
// =============================================================================

/// Why a path could not be turned into a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    Missing(SegmentKind),
    UnknownStage(String),
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(kind) => write!(f, "no {kind:?} segment"),
            Self::UnknownStage(stage) => write!(f, "unknown calibration stage {stage:?}"),
        }
    }
}

/// A classified path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPath {
    pub archetype: String,
    pub era: String,
    pub scenario: Option<String>,
    pub stage: CalibrationStage,
    /// The path deviated from the regular shape.
    pub irregular: bool,
}

impl NormalizedPath {
    /// Key for per-scenario tables.
    pub fn scenario_ref(&self) -> Result<ScenarioRef, PathError> {
        let scenario = self
            .scenario
            .clone()
            .ok_or(PathError::Missing(SegmentKind::Scenario))?;
        Ok(ScenarioRef::new(
            self.archetype.clone(),
            self.era.clone(),
            scenario,
            self.stage,
        ))
    }

    /// Key for per-archetype tables.
    #[must_use]
    pub fn archetype_ref(&self) -> ArchetypeRef {
        ArchetypeRef::new(self.archetype.clone(), self.era.clone(), self.stage)
    }
}

/// Normalize a raw key path.
///
/// `with_scenario` selects the regular shape: `[archetype, era, scenario]`
/// for scenario tables, `[archetype, era]` otherwise, each optionally
/// followed by one stage segment.
pub fn normalize_path(path: &[String], with_scenario: bool) -> Result<NormalizedPath, PathError> {
    let kinds: Vec<SegmentKind> = path.iter().map(|s| classify_segment(s)).collect();

    let last_of = |kind: SegmentKind| {
        path.iter()
            .zip(&kinds)
            .filter(|(_, k)| **k == kind)
            .map(|(s, _)| s.clone())
            .last()
    };
    let count_of = |kind: SegmentKind| kinds.iter().filter(|k| **k == kind).count();

    let archetype =
        last_of(SegmentKind::Archetype).ok_or(PathError::Missing(SegmentKind::Archetype))?;
    let era = last_of(SegmentKind::Era).ok_or(PathError::Missing(SegmentKind::Era))?;
    let scenario = last_of(SegmentKind::Scenario);
    if with_scenario && scenario.is_none() {
        return Err(PathError::Missing(SegmentKind::Scenario));
    }
    let stage = match last_of(SegmentKind::Stage) {
        Some(s) => s.parse().map_err(|_| PathError::UnknownStage(s))?,
        None => CalibrationStage::Unstaged,
    };

    let mut regular = vec![SegmentKind::Archetype, SegmentKind::Era];
    if with_scenario {
        regular.push(SegmentKind::Scenario);
    }
    if count_of(SegmentKind::Stage) == 1 {
        regular.push(SegmentKind::Stage);
    }
    let irregular = kinds != regular;

    Ok(NormalizedPath {
        archetype,
        era,
        scenario: if with_scenario { scenario } else { None },
        stage,
        irregular,
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn classifies_segments() {
        assert_eq!(classify_segment("scenario3"), SegmentKind::Scenario);
        assert_eq!(classify_segment("pre_calibration"), SegmentKind::Stage);
        assert_eq!(classify_segment("<1946"), SegmentKind::Era);
        assert_eq!(classify_segment("Before 1946"), SegmentKind::Era);
        assert_eq!(classify_segment("1975-1991"), SegmentKind::Era);
        assert_eq!(classify_segment("1975 - 1991"), SegmentKind::Era);
        assert_eq!(classify_segment("Corner Townhouse"), SegmentKind::Archetype);
        assert_eq!(classify_segment("scenario"), SegmentKind::Archetype);
        assert_eq!(classify_segment("19-20"), SegmentKind::Archetype);
    }

    #[test]
    fn regular_three_part_path() {
        let normalized = normalize_path(
            &path(&["Two-and-a-half-story House", "<1965", "scenario1"]),
            true,
        );
        assert_eq!(
            normalized,
            Ok(NormalizedPath {
                archetype: "Two-and-a-half-story House".into(),
                era: "<1965".into(),
                scenario: Some("scenario1".into()),
                stage: CalibrationStage::Unstaged,
                irregular: false,
            })
        );
    }

    #[test]
    fn regular_four_part_path() {
        let normalized = normalize_path(
            &path(&["Corner Townhouse", "<1946", "scenario2", "pre_calibration"]),
            true,
        );
        assert_eq!(normalized.as_ref().map(|n| n.stage), Ok(CalibrationStage::PreCalibration));
        assert_eq!(normalized.map(|n| n.irregular), Ok(false));
    }

    #[test]
    fn nested_archetype_takes_innermost() {
        let normalized = normalize_path(
            &path(&["Corner row house", "Corner Townhouse", "Before 1946", "scenario1"]),
            true,
        );
        assert_eq!(normalized.as_ref().map(|n| n.archetype.as_str()), Ok("Corner Townhouse"));
        assert_eq!(normalized.map(|n| n.irregular), Ok(true));
    }

    #[test]
    fn archetype_nested_under_era() {
        let normalized = normalize_path(
            &path(&[
                "Two-and-a-half-story House",
                "1975-1991",
                "Detached house",
                "scenario4",
                "pre_calibration",
            ]),
            true,
        );
        let n = normalized.as_ref();
        assert_eq!(n.map(|n| n.archetype.as_str()), Ok("Detached house"));
        assert_eq!(n.map(|n| n.era.as_str()), Ok("1975-1991"));
        assert_eq!(n.map(|n| n.irregular), Ok(true));
    }

    #[test]
    fn missing_scenario_is_an_error() {
        let err = normalize_path(&path(&["Corner Townhouse", "<1946"]), true);
        assert_eq!(err, Err(PathError::Missing(SegmentKind::Scenario)));
    }

    #[test]
    fn archetype_paths_without_scenario() {
        let normalized = normalize_path(
            &path(&["Corner Townhouse", "<1946", "pre_calibration"]),
            false,
        );
        assert_eq!(normalized.as_ref().map(|n| n.irregular), Ok(false));
        assert_eq!(
            normalized.map(|n| n.archetype_ref()),
            Ok(ArchetypeRef::new("Corner Townhouse", "<1946", CalibrationStage::PreCalibration))
        );
    }

    #[test]
    fn unknown_stage_is_an_error() {
        let err = normalize_path(&path(&["A", "2000", "scenario1", "mid_calibration"]), true);
        assert_eq!(err, Err(PathError::UnknownStage("mid_calibration".into())));
    }
}
