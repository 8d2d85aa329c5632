//! # Validation Module
//!
//! Load-time data-integrity findings.
//!
//! The reference data contains duplicate keys, irregular nesting, ranges
//! with the wrong number of bounds and R/U pairs that do not correspond.
//! None of these stop loading and none of them change a value: every finding
//! is recorded as a [`DataIssue`] and the data is kept exactly as written.

use crate::envelope::EnvelopeTable;
use crate::error::DataError;
use crate::types::{EnvelopeRecord, ScenarioKey, SourceRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Lowest accepted combined surface resistance (m²·K/W).
pub const DEFAULT_SURFACE_RESISTANCE_MIN: f64 = 0.0;

/// Highest accepted combined surface resistance (m²·K/W).
pub const DEFAULT_SURFACE_RESISTANCE_MAX: f64 = 0.5;

/// Tolerances for record checks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Accepted band for `1/U - R`, the surface resistances an opaque
    /// assembly adds on top of its own R-value.
    pub surface_resistance_min: f64,
    pub surface_resistance_max: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            surface_resistance_min: DEFAULT_SURFACE_RESISTANCE_MIN,
            surface_resistance_max: DEFAULT_SURFACE_RESISTANCE_MAX,
        }
    }
}

// =============================================================================
// ISSUES
// =============================================================================

/// How loudly an issue should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Structural oddity with no effect on values.
    Notice,
    /// A value may be wrong or was lost.
    Warning,
}

/// Category of a data-integrity finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Same key defined twice with identical values.
    DuplicateKey,
    /// Same key defined twice with different values; the later one won.
    ConflictingDuplicate,
    /// Key path deviates from `[archetype, era, scenario(, stage)]`.
    IrregularNesting,
    /// Key path lacks an archetype, era or scenario; entry skipped.
    MalformedKey,
    /// Record cannot be read (e.g. empty range); entry skipped.
    MalformedRecord,
    /// Component name outside the known set; entry skipped.
    UnknownComponent,
    /// Range with other than two bounds.
    RangeArity,
    /// R and U bounds of an opaque component do not correspond.
    ReciprocalMismatch,
    /// Opaque component without an R-value range.
    MissingResistance,
    /// Window or door with an R-value range.
    UnexpectedResistance,
    /// Area of zero, negative or not a number.
    NonPositiveArea,
}

impl IssueKind {
    pub const ALL: [IssueKind; 11] = [
        IssueKind::DuplicateKey,
        IssueKind::ConflictingDuplicate,
        IssueKind::IrregularNesting,
        IssueKind::MalformedKey,
        IssueKind::MalformedRecord,
        IssueKind::UnknownComponent,
        IssueKind::RangeArity,
        IssueKind::ReciprocalMismatch,
        IssueKind::MissingResistance,
        IssueKind::UnexpectedResistance,
        IssueKind::NonPositiveArea,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateKey => "duplicate_key",
            Self::ConflictingDuplicate => "conflicting_duplicate",
            Self::IrregularNesting => "irregular_nesting",
            Self::MalformedKey => "malformed_key",
            Self::MalformedRecord => "malformed_record",
            Self::UnknownComponent => "unknown_component",
            Self::RangeArity => "range_arity",
            Self::ReciprocalMismatch => "reciprocal_mismatch",
            Self::MissingResistance => "missing_resistance",
            Self::UnexpectedResistance => "unexpected_resistance",
            Self::NonPositiveArea => "non_positive_area",
        }
    }

    /// Kinds that [`check_record`] can raise from a record alone.
    #[must_use]
    pub fn is_record_check(self) -> bool {
        matches!(
            self,
            Self::ReciprocalMismatch
                | Self::MissingResistance
                | Self::UnexpectedResistance
                | Self::NonPositiveArea
        )
    }

    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::DuplicateKey | Self::IrregularNesting => Severity::Notice,
            _ => Severity::Warning,
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IssueKind {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| DataError::UnknownIssueKind(s.to_string()))
    }
}

/// One data-integrity finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataIssue {
    pub kind: IssueKind,
    /// Where the offending entry is written.
    pub source: SourceRef,
    /// Normalized key, when one could be built.
    pub key: Option<String>,
    /// The earlier entry an overwrite replaced.
    pub related: Option<SourceRef>,
    pub detail: String,
}

impl DataIssue {
    #[must_use]
    pub fn new(kind: IssueKind, source: SourceRef, detail: impl Into<String>) -> Self {
        Self {
            kind,
            source,
            key: None,
            related: None,
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: impl ToString) -> Self {
        self.key = Some(key.to_string());
        self
    }

    #[must_use]
    pub fn with_related(mut self, related: SourceRef) -> Self {
        self.related = Some(related);
        self
    }
}

impl fmt::Display for DataIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.source)?;
        if let Some(key) = &self.key {
            write!(f, " {key}")?;
        }
        write!(f, ": {}", self.detail)?;
        if let Some(related) = &self.related {
            write!(f, " (previously {related})")?;
        }
        Ok(())
    }
}

// =============================================================================
// REPORT
// =============================================================================

/// Ordered collection of findings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    issues: Vec<DataIssue>,
}

impl ValidationReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: DataIssue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, other: ValidationReport) {
        self.issues.extend(other.issues);
    }

    /// Keep only the issues matching `keep`.
    pub fn retain(&mut self, keep: impl FnMut(&DataIssue) -> bool) {
        self.issues.retain(keep);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DataIssue> {
        self.issues.iter()
    }

    /// Issues of one kind, in load order.
    pub fn of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &DataIssue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }

    #[must_use]
    pub fn count(&self, kind: IssueKind) -> usize {
        self.of_kind(kind).count()
    }

    /// Issue count per kind; kinds without issues are omitted.
    #[must_use]
    pub fn summary(&self) -> BTreeMap<IssueKind, usize> {
        let mut summary = BTreeMap::new();
        for issue in &self.issues {
            *summary.entry(issue.kind).or_insert(0) += 1;
        }
        summary
    }

    /// Check if any issue is a warning.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.warning_count() > 0
    }

    /// Number of issues with warning severity.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.kind.severity() == Severity::Warning)
            .count()
    }

    /// Plain-text rendering: summary first, then every issue.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut output = String::new();
        if self.issues.is_empty() {
            output.push_str("no data issues\n");
            return output;
        }

        output.push_str(&format!("{} data issues\n", self.issues.len()));
        for (kind, count) in self.summary() {
            output.push_str(&format!("  {kind:<24}{count:>5}\n"));
        }
        output.push('\n');
        for issue in &self.issues {
            output.push_str(&format!("{issue}\n"));
        }
        output
    }
}

// =============================================================================
// RECORD CHECKS
// =============================================================================

/// Check one envelope record in isolation.
pub fn check_record(
    key: &ScenarioKey,
    record: &EnvelopeRecord,
    source: &SourceRef,
    config: &ValidationConfig,
    report: &mut ValidationReport,
) {
    let issue = |kind, detail: String| {
        DataIssue::new(kind, source.clone(), detail).with_key(key)
    };

    if record.area_m2.is_nan() || record.area_m2 <= 0.0 {
        report.push(issue(
            IssueKind::NonPositiveArea,
            format!("area_m2 = {}", record.area_m2),
        ));
    }

    match (key.component.is_opaque(), &record.r_value_range) {
        (true, None) => report.push(issue(
            IssueKind::MissingResistance,
            format!("{} has no R_value_range", key.component),
        )),
        (false, Some(r)) => report.push(issue(
            IssueKind::UnexpectedResistance,
            format!("{} carries R_value_range {r}", key.component),
        )),
        (true, Some(r)) => {
            let mismatches = reciprocal_mismatches(
                r.bounds(),
                record.u_value_range.bounds(),
                config,
            );
            if !mismatches.is_empty() {
                report.push(issue(
                    IssueKind::ReciprocalMismatch,
                    format!(
                        "R {r} vs U {}: {}",
                        record.u_value_range,
                        mismatches.join("; ")
                    ),
                ));
            }
        }
        (false, None) => {}
    }
}

/// Describe each bound whose implied surface resistance leaves the band.
fn reciprocal_mismatches(r: [f64; 2], u: [f64; 2], config: &ValidationConfig) -> Vec<String> {
    let labels = ["min", "max"];
    r.into_iter()
        .zip(u)
        .zip(labels)
        .filter_map(|((r, u), label)| {
            if u <= 0.0 {
                return Some(format!("{label} U is not positive"));
            }
            let surface = 1.0 / u - r;
            let within = surface >= config.surface_resistance_min
                && surface <= config.surface_resistance_max;
            (!within).then(|| format!("{label} bound implies surface resistance {surface:.2}"))
        })
        .collect()
}

/// Re-run record checks over a whole table.
///
/// Structural findings (duplicates, nesting, arity) only exist while
/// loading; this covers what can be judged from the records alone, e.g.
/// after overrides were applied.
#[must_use]
pub fn validate_table(table: &EnvelopeTable, config: &ValidationConfig) -> ValidationReport {
    let mut report = ValidationReport::new();
    for (key, entry) in table.iter() {
        check_record(key, &entry.value, &entry.source, config, &mut report);
    }
    report
}

// =============================================================================
// TESTS
// =============================================================================
