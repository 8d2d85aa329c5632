//! # Dataset Module
//!
//! Source documents, the loader that normalizes them, and [`ReferenceData`],
//! the immutable set of tables every lookup goes through.
//!
//! A source document is the entry-by-entry transcription of one reference
//! file. Entries keep their source line and their raw key path, so the loader
//! sees duplicates and irregular keys exactly as they were written. Loading
//! never fails on bad entries: they are skipped or kept and reported in the
//! [`ValidationReport`].

use crate::dwelling::{
    CHARACTERISTICS_TABLE, Characteristics, CharacteristicsTable, DOMESTIC_HOT_WATER_TABLE,
    DomesticHotWater, DomesticHotWaterTable, INSULATION_TABLE, InsulationPerformance,
    InsulationTable, SPACE_HEATING_TABLE, ScenarioServices, SpaceHeating, SpaceHeatingTable,
    VENTILATION_TABLE, Ventilation, VentilationTable,
};
use crate::envelope::EnvelopeTable;
use crate::error::{DataError, DataResult, LookupError};
use crate::normalize::{NormalizedPath, PathError, normalize_path};
use crate::table::ReferenceTable;
use crate::types::{
    ArchetypeRef, CalibrationStage, Component, EnvelopeRecord, ScenarioKey, ScenarioRef,
    SourceRef, ValueRange,
};
use crate::validation::{DataIssue, IssueKind, ValidationConfig, ValidationReport, check_record};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::OnceLock;

/// Envelope data of the regional archetypes, nested addressing.
pub const BUILDING_ENVELOPE_JSON: &str = include_str!("../data/building_envelope.json");

/// Corner townhouse data with side tables, tuple addressing.
pub const CORNER_TOWNHOUSE_JSON: &str = include_str!("../data/corner_townhouse.json");

// =============================================================================
// SOURCE DOCUMENTS
// =============================================================================

/// One envelope entry as transcribed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEnvelopeEntry {
    pub line: u32,
    #[serde(alias = "key")]
    pub path: Vec<String>,
    pub component: String,
    pub area_m2: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r_value_range: Option<Vec<f64>>,
    pub u_value_range: Vec<f64>,
}

/// One side-table entry as transcribed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEntry<T> {
    pub line: u32,
    pub key: Vec<String>,
    #[serde(flatten)]
    pub record: T,
}

/// One transcribed reference file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Document identifier used in [`SourceRef`]s.
    pub source: String,
    #[serde(default)]
    pub envelope: Vec<RawEnvelopeEntry>,
    #[serde(default)]
    pub characteristics: Vec<RawEntry<Characteristics>>,
    #[serde(default)]
    pub ventilation: Vec<RawEntry<Ventilation>>,
    #[serde(default)]
    pub space_heating: Vec<RawEntry<SpaceHeating>>,
    #[serde(default)]
    pub domestic_hot_water: Vec<RawEntry<DomesticHotWater>>,
    #[serde(default)]
    pub insulation: Vec<RawEntry<InsulationPerformance>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(SourceDocument),
    Many(Vec<SourceDocument>),
}

impl SourceDocument {
    /// Parse a JSON text holding one document or an array of documents.
    pub fn parse_all(json: &str) -> DataResult<Vec<SourceDocument>> {
        Ok(match serde_json::from_str(json)? {
            OneOrMany::One(doc) => vec![doc],
            OneOrMany::Many(docs) => docs,
        })
    }

    /// The documents compiled into the library, in load order.
    pub fn embedded() -> DataResult<Vec<SourceDocument>> {
        Ok(vec![
            serde_json::from_str(BUILDING_ENVELOPE_JSON)?,
            serde_json::from_str(CORNER_TOWNHOUSE_JSON)?,
        ])
    }
}

// =============================================================================
// REFERENCE DATA
// =============================================================================

/// The loaded, immutable reference tables.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceData {
    pub envelope: EnvelopeTable,
    pub characteristics: CharacteristicsTable,
    pub ventilation: VentilationTable,
    pub space_heating: SpaceHeatingTable,
    pub domestic_hot_water: DomesticHotWaterTable,
    pub insulation: InsulationTable,
    /// Findings collected while loading.
    pub issues: ValidationReport,
    /// Tolerances the record checks ran with.
    pub config: ValidationConfig,
}

static EMBEDDED: OnceLock<Result<ReferenceData, String>> = OnceLock::new();

impl ReferenceData {
    /// Tables with no records.
    #[must_use]
    pub fn empty(config: ValidationConfig) -> Self {
        Self {
            envelope: EnvelopeTable::envelope(),
            characteristics: CharacteristicsTable::new(CHARACTERISTICS_TABLE),
            ventilation: VentilationTable::new(VENTILATION_TABLE),
            space_heating: SpaceHeatingTable::new(SPACE_HEATING_TABLE),
            domestic_hot_water: DomesticHotWaterTable::new(DOMESTIC_HOT_WATER_TABLE),
            insulation: InsulationTable::new(INSULATION_TABLE),
            issues: ValidationReport::new(),
            config,
        }
    }

    /// The embedded dataset, parsed on first use and shared afterwards.
    pub fn embedded() -> DataResult<&'static ReferenceData> {
        EMBEDDED
            .get_or_init(|| {
                Self::load_embedded(ValidationConfig::default()).map_err(|e| e.to_string())
            })
            .as_ref()
            .map_err(|e| DataError::Embedded(e.clone()))
    }

    /// Parse the embedded dataset afresh, e.g. with other tolerances.
    pub fn load_embedded(config: ValidationConfig) -> DataResult<Self> {
        Ok(Self::from_documents(&SourceDocument::embedded()?, config))
    }

    /// Load a JSON dataset holding one document or an array of documents.
    pub fn from_json_str(json: &str, config: ValidationConfig) -> DataResult<Self> {
        Ok(Self::from_documents(&SourceDocument::parse_all(json)?, config))
    }

    /// Normalize documents into tables, in document and entry order.
    #[must_use]
    pub fn from_documents(documents: &[SourceDocument], config: ValidationConfig) -> Self {
        let mut loader = Loader::new(config);
        for document in documents {
            loader.load_document(document);
        }
        loader.finish()
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    /// Envelope lookup; see [`EnvelopeTable::get_envelope`].
    pub fn get_envelope(
        &self,
        archetype: &str,
        era: &str,
        scenario: &str,
        component: Component,
    ) -> Result<&EnvelopeRecord, LookupError> {
        self.envelope.get_envelope(archetype, era, scenario, component)
    }

    /// Characteristics of an (archetype, era), any stage.
    pub fn characteristics_of(
        &self,
        archetype: &str,
        era: &str,
    ) -> Result<&Characteristics, LookupError> {
        self.characteristics
            .resolve(&ArchetypeRef::new(archetype, era, CalibrationStage::Unstaged))
    }

    /// Everything the side tables record for a scenario, any stage.
    #[must_use]
    pub fn services(&self, scenario: &ScenarioRef) -> ScenarioServices<'_> {
        ScenarioServices {
            ventilation: self.ventilation.resolve(scenario).ok(),
            space_heating: self.space_heating.resolve(scenario).ok(),
            domestic_hot_water: self.domestic_hot_water.resolve(scenario).ok(),
            insulation: self.insulation.resolve(scenario).ok(),
        }
    }
}

// =============================================================================
// LOADER
// =============================================================================

/// Builds tables entry by entry, collecting findings as it goes.
pub(crate) struct Loader {
    data: ReferenceData,
}

impl Loader {
    pub(crate) fn new(config: ValidationConfig) -> Self {
        Self {
            data: ReferenceData::empty(config),
        }
    }

    pub(crate) fn finish(self) -> ReferenceData {
        self.data
    }

    pub(crate) fn report(&mut self, issue: DataIssue) {
        self.data.issues.push(issue);
    }

    /// Check a record under an already typed key and insert it.
    pub(crate) fn load_record(
        &mut self,
        key: ScenarioKey,
        record: EnvelopeRecord,
        origin: SourceRef,
    ) {
        let issues = &mut self.data.issues;
        check_record(&key, &record, &origin, &self.data.config, issues);
        insert_reporting(&mut self.data.envelope, key, record, origin, issues);
    }

    fn load_document(&mut self, document: &SourceDocument) {
        let source = document.source.as_str();

        for entry in &document.envelope {
            self.load_envelope_entry(source, entry);
        }

        let data = &mut self.data;
        let issues = &mut data.issues;
        load_entries(
            &mut data.characteristics,
            source,
            &document.characteristics,
            false,
            issues,
            |p| Ok(p.archetype_ref()),
        );
        load_entries(
            &mut data.ventilation,
            source,
            &document.ventilation,
            true,
            issues,
            NormalizedPath::scenario_ref,
        );
        load_entries(
            &mut data.space_heating,
            source,
            &document.space_heating,
            true,
            issues,
            NormalizedPath::scenario_ref,
        );
        load_entries(
            &mut data.domestic_hot_water,
            source,
            &document.domestic_hot_water,
            true,
            issues,
            NormalizedPath::scenario_ref,
        );
        load_entries(
            &mut data.insulation,
            source,
            &document.insulation,
            true,
            issues,
            NormalizedPath::scenario_ref,
        );
    }

    fn load_envelope_entry(&mut self, source: &str, entry: &RawEnvelopeEntry) {
        let origin = SourceRef::new(source, entry.line);
        let issues = &mut self.data.issues;

        let component: Component = match entry.component.parse() {
            Ok(c) => c,
            Err(_) => {
                issues.push(DataIssue::new(
                    IssueKind::UnknownComponent,
                    origin,
                    format!("component {:?}", entry.component),
                ));
                return;
            }
        };

        let Some(scenario) = normalize(
            &entry.path,
            true,
            &origin,
            issues,
            NormalizedPath::scenario_ref,
        ) else {
            return;
        };
        let key = scenario.component(component);

        let Some(u_value_range) = read_range(
            "U_value_range",
            &entry.u_value_range,
            &key,
            &origin,
            issues,
        ) else {
            return;
        };
        let r_value_range = match &entry.r_value_range {
            Some(values) => match read_range("R_value_range", values, &key, &origin, issues) {
                Some(range) => Some(range),
                None => return,
            },
            None => None,
        };

        let record = EnvelopeRecord::new(entry.area_m2, r_value_range, u_value_range);
        self.load_record(key, record, origin);
    }
}

/// Normalize a path, reporting irregular and malformed keys.
fn normalize<K>(
    path: &[String],
    with_scenario: bool,
    origin: &SourceRef,
    issues: &mut ValidationReport,
    key_of: impl Fn(&NormalizedPath) -> Result<K, PathError>,
) -> Option<K>
where
    K: Display,
{
    let keyed = normalize_path(path, with_scenario).and_then(|n| key_of(&n).map(|k| (n, k)));
    match keyed {
        Ok((normalized, key)) => {
            if normalized.irregular {
                issues.push(
                    DataIssue::new(
                        IssueKind::IrregularNesting,
                        origin.clone(),
                        format!("path {path:?} read as {key}"),
                    )
                    .with_key(&key),
                );
            }
            Some(key)
        }
        Err(e) => {
            issues.push(DataIssue::new(
                IssueKind::MalformedKey,
                origin.clone(),
                format!("path {path:?}: {e}"),
            ));
            None
        }
    }
}

/// Read a range of any arity; `None` when it holds no value at all.
fn read_range(
    name: &str,
    values: &[f64],
    key: &ScenarioKey,
    origin: &SourceRef,
    issues: &mut ValidationReport,
) -> Option<ValueRange> {
    let range = match values {
        [] => {
            issues.push(
                DataIssue::new(
                    IssueKind::MalformedRecord,
                    origin.clone(),
                    format!("{name} is empty"),
                )
                .with_key(key),
            );
            return None;
        }
        [min, max] => return Some(ValueRange::new(*min, *max)),
        [value] => ValueRange::fixed(*value),
        [min, max, ..] => ValueRange::new(*min, *max),
    };
    issues.push(
        DataIssue::new(
            IssueKind::RangeArity,
            origin.clone(),
            format!("{name} has {} values, read as {range}", values.len()),
        )
        .with_key(key),
    );
    Some(range)
}

/// Insert with last-write-wins, reporting any overwrite.
fn insert_reporting<K, V>(
    table: &mut ReferenceTable<K, V>,
    key: K,
    value: V,
    origin: SourceRef,
    issues: &mut ValidationReport,
) where
    K: Ord + Clone + Display,
    V: PartialEq,
{
    let issue_key = key.to_string();
    let name = table.name();
    let Some(previous) = table.insert(key.clone(), value, origin.clone()) else {
        return;
    };
    let identical = table.get_entry(&key).is_some_and(|e| e.value == previous.value);
    let (kind, detail) = if identical {
        (IssueKind::DuplicateKey, format!("{name} key defined again with the same values"))
    } else {
        (IssueKind::ConflictingDuplicate, format!("{name} key redefined with different values"))
    };
    issues.push(
        DataIssue::new(kind, origin, detail)
            .with_key(issue_key)
            .with_related(previous.source),
    );
}

fn load_entries<K, V>(
    table: &mut ReferenceTable<K, V>,
    source: &str,
    entries: &[RawEntry<V>],
    with_scenario: bool,
    issues: &mut ValidationReport,
    key_of: impl Fn(&NormalizedPath) -> Result<K, PathError>,
) where
    K: Ord + Clone + Display,
    V: Clone + PartialEq,
{
    for entry in entries {
        let origin = SourceRef::new(source, entry.line);
        if let Some(key) = normalize(&entry.key, with_scenario, &origin, issues, &key_of) {
            insert_reporting(table, key, entry.record.clone(), origin, issues);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(line: u32, path: &[&str], component: &str, u: &[f64]) -> RawEnvelopeEntry {
        RawEnvelopeEntry {
            line,
            path: path.iter().map(|s| s.to_string()).collect(),
            component: component.to_string(),
            area_m2: 7.73,
            r_value_range: None,
            u_value_range: u.to_vec(),
        }
    }

    fn load(envelope: Vec<RawEnvelopeEntry>) -> ReferenceData {
        let doc = SourceDocument {
            source: "doc".into(),
            envelope,
            ..SourceDocument::default()
        };
        ReferenceData::from_documents(&[doc], ValidationConfig::default())
    }

    const PATH: [&str; 3] = ["Corner Townhouse", "<1946", "scenario1"];

    #[test]
    fn last_write_wins_and_is_reported() {
        let data = load(vec![
            entry(1, &PATH, "doors", &[3.4, 1.4]),
            entry(2, &PATH, "doors", &[3.4, 1.4]),
            entry(3, &PATH, "doors", &[2.0, 1.0]),
        ]);

        let found = data.get_envelope("Corner Townhouse", "<1946", "scenario1", Component::Doors);
        assert_eq!(found.map(|r| r.u_value_range), Ok(ValueRange::new(2.0, 1.0)));
        assert_eq!(data.issues.count(IssueKind::DuplicateKey), 1);

        let conflict: Vec<_> = data.issues.of_kind(IssueKind::ConflictingDuplicate).collect();
        assert_eq!(conflict.len(), 1);
        assert_eq!(conflict[0].source.line, 3);
        assert_eq!(conflict[0].related.as_ref().map(|r| r.line), Some(2));
    }

    #[test]
    fn range_arity_is_normalized() {
        let data = load(vec![
            entry(1, &PATH, "doors", &[1.4]),
            entry(2, &PATH, "windows", &[2.9, 1.8, 1.1]),
            entry(3, &["A", "2000", "scenario1"], "doors", &[]),
        ]);
        let doors = data.get_envelope("Corner Townhouse", "<1946", "scenario1", Component::Doors);
        let windows = data.get_envelope(
            "Corner Townhouse",
            "<1946",
            "scenario1",
            Component::Windows,
        );
        assert_eq!(doors.map(|r| r.u_value_range), Ok(ValueRange::fixed(1.4)));
        assert_eq!(windows.map(|r| r.u_value_range), Ok(ValueRange::new(2.9, 1.8)));
        assert_eq!(data.issues.count(IssueKind::RangeArity), 2);
        assert_eq!(data.issues.count(IssueKind::MalformedRecord), 1);
        assert_eq!(data.envelope.len(), 2);
    }

    #[test]
    fn bad_keys_and_components_are_skipped() {
        let data = load(vec![
            entry(1, &["Corner Townhouse", "<1946"], "doors", &[1.4, 1.4]),
            entry(2, &PATH, "roof", &[1.4, 1.4]),
            entry(3, &["Row", "Corner Townhouse", "<1946", "scenario1"], "doors", &[1.4, 1.4]),
        ]);
        assert_eq!(data.issues.count(IssueKind::MalformedKey), 1);
        assert_eq!(data.issues.count(IssueKind::UnknownComponent), 1);
        assert_eq!(data.issues.count(IssueKind::IrregularNesting), 1);
        assert_eq!(data.envelope.len(), 1);
    }

    #[test]
    fn side_tables_load_from_json() {
        let json = r#"{
            "source": "t",
            "insulation": [
                {"line": 4, "key": ["Corner Townhouse", "<1946", "scenario1", "pre_calibration"],
                 "form_factor_m2_per_m2": 2.04, "standard_value_kwh_m2": 169.22,
                 "heat_demand_kwh_m2": 312.84}
            ]
        }"#;
        let data = ReferenceData::from_json_str(json, ValidationConfig::default());
        let scenario = ScenarioRef::new(
            "Corner Townhouse",
            "<1946",
            "scenario1",
            CalibrationStage::Unstaged,
        );
        let heat = data
            .as_ref()
            .ok()
            .and_then(|d| d.services(&scenario).insulation.map(|i| i.heat_demand_kwh_m2));
        assert_eq!(heat, Some(312.84));
    }

    #[test]
    fn invalid_json_is_an_error() {
        let result = ReferenceData::from_json_str("{", ValidationConfig::default());
        assert!(matches!(result, Err(DataError::Json(_))));
    }
}
