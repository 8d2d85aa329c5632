//! # Dwelling Tables
//!
//! Side tables that accompany the envelope data: per-dwelling
//! characteristics, and per-scenario ventilation, space heating, domestic
//! hot water and standard insulation performance.
//!
//! All of them share the flat key → record shape of [`ReferenceTable`] and
//! resolve calibration stages like the envelope table does.

use crate::table::ReferenceTable;
use crate::types::{ArchetypeRef, ScenarioRef};
use serde::{Deserialize, Serialize};

// =============================================================================
// RECORDS
// =============================================================================

/// Physical characteristics of a dwelling archetype in one era.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Characteristics {
    pub usable_floor_area_m2: f64,
    pub number_of_floors_within_dwelling: u32,
    pub number_of_floors_entire_building: u32,
    pub number_of_units_entire_building: u32,
    pub building_type: String,
    pub type_of_unit_variant: String,
    pub building_height_m: f64,
    pub ground_floor_boundary: String,
}

/// Ventilation installation of a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ventilation {
    pub ventilation_system: String,
    pub ventilation_provision: String,
    pub heat_recovery: String,
    /// Air tightness as written (`qv10`), often a label rather than a number.
    pub air_tightness_qv10: String,
}

/// Space heating installation of a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceHeating {
    pub main_heating: String,
    pub system_type: String,
    pub heating_appliance: String,
    pub boiler_air_heating: String,
    pub emission_system: String,
    pub temperature_regime: String,
}

/// Domestic hot water installation of a scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomesticHotWater {
    pub dhw_system: String,
    pub installation_type: String,
    pub specific_appliance: String,
    pub cw_class_hot_water_comfort: String,
    pub shower_heat_recovery_present: String,
}

/// Standard-dwelling insulation performance of a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsulationPerformance {
    /// Form factor A_loss / A_use (m²/m²).
    pub form_factor_m2_per_m2: f64,
    /// Standard value in kWh/m².
    pub standard_value_kwh_m2: f64,
    /// Heat demand Q_H;nd in kWh/m².
    pub heat_demand_kwh_m2: f64,
}

// =============================================================================
// TABLES
// =============================================================================

pub const CHARACTERISTICS_TABLE: &str = "characteristics";
pub const VENTILATION_TABLE: &str = "ventilation";
pub const SPACE_HEATING_TABLE: &str = "space_heating";
pub const DOMESTIC_HOT_WATER_TABLE: &str = "domestic_hot_water";
pub const INSULATION_TABLE: &str = "insulation";

pub type CharacteristicsTable = ReferenceTable<ArchetypeRef, Characteristics>;
pub type VentilationTable = ReferenceTable<ScenarioRef, Ventilation>;
pub type SpaceHeatingTable = ReferenceTable<ScenarioRef, SpaceHeating>;
pub type DomesticHotWaterTable = ReferenceTable<ScenarioRef, DomesticHotWater>;
pub type InsulationTable = ReferenceTable<ScenarioRef, InsulationPerformance>;

/// Everything the side tables know about one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioServices<'a> {
    pub ventilation: Option<&'a Ventilation>,
    pub space_heating: Option<&'a SpaceHeating>,
    pub domestic_hot_water: Option<&'a DomesticHotWater>,
    pub insulation: Option<&'a InsulationPerformance>,
}

impl ScenarioServices<'_> {
    /// Check if no side table knows the scenario.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ventilation.is_none()
            && self.space_heating.is_none()
            && self.domestic_hot_water.is_none()
            && self.insulation.is_none()
    }
}

// =============================================================================
// TESTS
// =============================================================================
