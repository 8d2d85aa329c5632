//! # Archetype Core
//!
//! Read-only reference tables of building-envelope performance for a set of
//! residential archetypes, indexed by construction era and retrofit scenario.
//!
//! Each record gives the surface area, thermal resistance (R, opaque
//! components only) and thermal transmittance (U) of one envelope component.
//! Side tables add dwelling characteristics and the building services of
//! each scenario.
//!
//! ```no_run
//! use archetype_core::{Component, ReferenceData};
//!
//! # fn main() -> Result<(), archetype_core::Error> {
//! let data = ReferenceData::embedded()?;
//! let doors = data.get_envelope("Corner Townhouse", "<1946", "scenario1", Component::Doors)?;
//! println!("{} m², U {}", doors.area_m2, doors.u_value_range);
//! # Ok(())
//! # }
//! ```
//!
//! The crate is pure and deterministic: no I/O beyond the embedded data, no
//! logging, no randomness. Data-quality findings are returned in a
//! [`ValidationReport`] for the caller to surface.

pub mod dataset;
pub mod dwelling;
pub mod envelope;
pub mod error;
pub mod formats;
pub mod normalize;
pub mod overrides;
pub mod table;
pub mod types;
pub mod validation;

pub use dataset::{ReferenceData, SourceDocument};
pub use dwelling::{
    Characteristics, DomesticHotWater, InsulationPerformance, ScenarioServices, SpaceHeating,
    Ventilation,
};
pub use envelope::EnvelopeTable;
pub use error::{DataError, DataResult, Error, LookupError, OverrideError};
pub use formats::{InterchangeRecord, decode_snapshot, encode_snapshot, load_dataset};
pub use overrides::{OverrideParam, OverrideRule, OverrideSet};
pub use table::{Entry, ReferenceTable};
pub use types::{
    ArchetypeRef, CalibrationStage, Component, EnvelopeRecord, PickStrategy, PickedValues,
    ScenarioKey, ScenarioRef, SourceRef, ValueRange,
};
pub use validation::{DataIssue, IssueKind, Severity, ValidationConfig, ValidationReport};

/// Envelope lookup against the embedded dataset.
///
/// Archetype, era and scenario match exactly; the calibration stage is
/// resolved in [`CalibrationStage::RESOLUTION_ORDER`].
pub fn get_envelope(
    archetype: &str,
    era: &str,
    scenario: &str,
    component: Component,
) -> Result<&'static EnvelopeRecord, Error> {
    Ok(ReferenceData::embedded()?.get_envelope(archetype, era, scenario, component)?)
}
