//! # Response Views
//!
//! Serializable answers shared by the CLI (`--json`) and the HTTP API.

use archetype_core::formats::InterchangeRecord;
use archetype_core::{
    CalibrationStage, Component, DataIssue, IssueKind, LookupError, PickStrategy, PickedValues,
    ReferenceData, ScenarioKey, ScenarioRef, ScenarioServices, SourceRef,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// One envelope record with its resolved key and provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvelopeView {
    #[serde(flatten)]
    pub record: InterchangeRecord,
    pub source: SourceRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picked: Option<PickedValues>,
}

/// Look up one component, resolving the calibration stage.
pub fn envelope_view(
    data: &ReferenceData,
    archetype: &str,
    era: &str,
    scenario: &str,
    component: Component,
    pick: Option<PickStrategy>,
) -> Result<EnvelopeView, LookupError> {
    let asked = ScenarioKey::new(archetype, era, scenario, CalibrationStage::Unstaged, component);
    let (key, entry) = data
        .envelope
        .resolve_entry(&asked)
        .ok_or_else(|| LookupError::NotFound {
            table: data.envelope.name(),
            key: format!("({archetype}, {era}, {scenario}, {component})"),
        })?;
    Ok(EnvelopeView {
        record: InterchangeRecord::new(key, &entry.value),
        source: entry.source.clone(),
        picked: pick.map(|strategy| entry.value.pick(strategy)),
    })
}

/// All components and services of one scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioView<'a> {
    pub scenario: ScenarioRef,
    pub components: Vec<EnvelopeView>,
    pub services: ScenarioServices<'a>,
}

pub fn scenario_view<'a>(
    data: &'a ReferenceData,
    archetype: &str,
    era: &str,
    scenario: &str,
) -> Result<ScenarioView<'a>, LookupError> {
    let asked = ScenarioRef::new(archetype, era, scenario, CalibrationStage::Unstaged);
    let resolved = data.envelope.resolve_scenario(&asked)?;
    let components = Component::ALL
        .into_iter()
        .filter_map(|component| {
            let key = resolved.component(component);
            data.envelope.get_entry(&key).map(|entry| EnvelopeView {
                record: InterchangeRecord::new(&key, &entry.value),
                source: entry.source.clone(),
                picked: None,
            })
        })
        .collect();
    Ok(ScenarioView {
        services: data.services(&resolved),
        scenario: resolved,
        components,
    })
}

/// Eras and scenarios recorded for one archetype.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchetypeView {
    pub archetype: String,
    pub eras: BTreeMap<String, Vec<String>>,
}

/// Every archetype, or only `only` when given.
#[must_use]
pub fn archetype_views(data: &ReferenceData, only: Option<&str>) -> Vec<ArchetypeView> {
    data.envelope
        .archetypes()
        .into_iter()
        .filter(|a| only.is_none_or(|o| o == *a))
        .map(|archetype| ArchetypeView {
            archetype: archetype.to_string(),
            eras: data
                .envelope
                .eras(archetype)
                .into_iter()
                .map(|era| {
                    let mut scenarios: Vec<String> = data
                        .envelope
                        .scenarios(archetype, era)
                        .into_iter()
                        .map(|s| s.scenario)
                        .collect();
                    scenarios.dedup();
                    (era.to_string(), scenarios)
                })
                .collect(),
        })
        .collect()
}

/// Load findings with a per-kind summary.
#[derive(Debug, Clone, Serialize)]
pub struct IssuesView<'a> {
    pub total: usize,
    pub summary: BTreeMap<IssueKind, usize>,
    pub issues: Vec<&'a DataIssue>,
}

#[must_use]
pub fn issues_view(data: &ReferenceData, kind: Option<IssueKind>) -> IssuesView<'_> {
    IssuesView {
        total: data.issues.len(),
        summary: data.issues.summary(),
        issues: data
            .issues
            .iter()
            .filter(|i| kind.is_none_or(|k| i.kind == k))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> Option<&'static ReferenceData> {
        ReferenceData::embedded().ok()
    }

    #[test]
    fn envelope_view_reports_resolved_stage() {
        let view = data().and_then(|d| {
            envelope_view(
                d,
                "Corner Townhouse",
                "<1946",
                "scenario1",
                Component::Doors,
                Some(PickStrategy::Lower),
            )
            .ok()
        });
        let view = view.as_ref();
        assert_eq!(
            view.map(|v| v.record.calibration_stage),
            Some(CalibrationStage::PreCalibration),
        );
        assert_eq!(view.and_then(|v| v.picked).map(|p| p.u_value), Some(3.4));
    }

    #[test]
    fn scenario_view_collects_components() {
        let view =
            data().and_then(|d| scenario_view(d, "Corner Townhouse", "<1946", "scenario1").ok());
        assert_eq!(view.as_ref().map(|v| v.components.len()), Some(5));
        assert!(view.is_some_and(|v| v.services.insulation.is_some()));
    }

    #[test]
    fn archetype_filter() {
        let views = data()
            .map(|d| archetype_views(d, Some("Corner Townhouse")))
            .unwrap_or_default();
        assert_eq!(views.len(), 1);
        assert!(views.iter().all(|v| v.eras.contains_key("<1946")));
    }
}
