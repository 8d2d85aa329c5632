//! # CLI Module
//!
//! Command-line interface for querying and exporting the reference data.
//!
//! Commands build their output as a string so they can be tested without
//! capturing stdout. Logs go to stderr.

use crate::AppError;
use crate::api::{self, AppState};
use crate::config::{DEFAULT_BIND, DataConfig};
use crate::response::{archetype_views, envelope_view, issues_view, scenario_view};
use archetype_core::formats::{export_records, records_to_json};
use archetype_core::validation::{DEFAULT_SURFACE_RESISTANCE_MAX, DEFAULT_SURFACE_RESISTANCE_MIN};
use archetype_core::{
    Component, IssueKind, PickStrategy, ReferenceData, ValidationConfig, encode_snapshot,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;

// =============================================================================
// ARGUMENTS
// =============================================================================

/// Building archetype envelope reference data.
#[derive(Parser, Debug)]
#[command(name = "archetype", version, about)]
pub struct Cli {
    /// Dataset file (source JSON, interchange JSON or snapshot); embedded data when omitted
    #[arg(long, global = true, env = "ARCHETYPE_DATASET")]
    pub dataset: Option<PathBuf>,

    /// Override rules file (JSON array)
    #[arg(long, global = true, env = "ARCHETYPE_OVERRIDES")]
    pub overrides: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Log filter (EnvFilter syntax)
    #[arg(long, global = true, env = "ARCHETYPE_LOG", default_value = "info")]
    pub log: String,

    /// Lowest accepted surface resistance 1/U - R (m²K/W)
    #[arg(long, global = true, default_value_t = DEFAULT_SURFACE_RESISTANCE_MIN)]
    pub surface_min: f64,

    /// Highest accepted surface resistance 1/U - R (m²K/W)
    #[arg(long, global = true, default_value_t = DEFAULT_SURFACE_RESISTANCE_MAX)]
    pub surface_max: f64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Look up one component of one scenario
    Get {
        archetype: String,
        era: String,
        scenario: String,
        component: Component,
        /// Also collapse the ranges: midpoint, lower or upper
        #[arg(long)]
        pick: Option<PickStrategy>,
    },

    /// Show every component and the services of one scenario
    Scenario {
        archetype: String,
        era: String,
        scenario: String,
    },

    /// List archetypes with their eras and scenarios
    List {
        /// Only this archetype
        archetype: Option<String>,
    },

    /// Report data issues found while loading
    Validate {
        /// Exit with an error when any issue is a warning
        #[arg(long)]
        strict: bool,

        /// Only issues of this kind (e.g. conflicting_duplicate)
        #[arg(long)]
        kind: Option<IssueKind>,
    },

    /// Write the envelope table to a file
    Export {
        output: PathBuf,

        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
    },

    /// Serve read-only lookups over HTTP
    Serve {
        #[arg(long, env = "ARCHETYPE_BIND", default_value = DEFAULT_BIND)]
        bind: SocketAddr,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Interchange JSON, one flat object per record
    Json,
    /// Canonical binary snapshot of every table
    Snapshot,
}

impl Cli {
    #[must_use]
    pub fn data_config(&self) -> DataConfig {
        DataConfig {
            dataset: self.dataset.clone(),
            overrides: self.overrides.clone(),
            validation: ValidationConfig {
                surface_resistance_min: self.surface_min,
                surface_resistance_max: self.surface_max,
            },
        }
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

fn to_json<T: Serialize>(value: &T) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn range_text(range: Option<(f64, f64)>) -> String {
    range.map_or_else(|| "-".to_string(), |(min, max)| format!("({min:.2}, {max:.2})"))
}

/// Look up one component.
pub fn cmd_get(
    data: &ReferenceData,
    archetype: &str,
    era: &str,
    scenario: &str,
    component: Component,
    pick: Option<PickStrategy>,
    json: bool,
) -> Result<String, AppError> {
    let view = envelope_view(data, archetype, era, scenario, component, pick)?;
    if json {
        return to_json(&view);
    }

    let r = &view.record;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} / {} / {} / {} / {}",
        r.archetype, r.era, r.scenario, r.calibration_stage, r.component
    );
    let _ = writeln!(out, "  area_m2        {:.2}", r.area_m2);
    let _ = writeln!(
        out,
        "  r_value_range  {}",
        range_text(r.r_value_min.zip(r.r_value_max))
    );
    let _ = writeln!(
        out,
        "  u_value_range  {}",
        range_text(Some((r.u_value_min, r.u_value_max)))
    );
    let _ = writeln!(out, "  source         {}", view.source);
    if let Some(picked) = view.picked {
        let r_value = picked.r_value.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"));
        let _ = writeln!(
            out,
            "  picked         {:?}: R {r_value}, U {:.3}",
            picked.strategy, picked.u_value
        );
    }
    Ok(out)
}

/// Show one scenario.
pub fn cmd_scenario(
    data: &ReferenceData,
    archetype: &str,
    era: &str,
    scenario: &str,
    json: bool,
) -> Result<String, AppError> {
    let view = scenario_view(data, archetype, era, scenario)?;
    if json {
        return to_json(&view);
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", view.scenario);
    let _ = writeln!(
        out,
        "  {:<18}{:>9}  {:<14}  {:<14}",
        "component", "area_m2", "R", "U"
    );
    for c in &view.components {
        let r = &c.record;
        let _ = writeln!(
            out,
            "  {:<18}{:>9.2}  {:<14}  {:<14}",
            r.component.as_str(),
            r.area_m2,
            range_text(r.r_value_min.zip(r.r_value_max)),
            range_text(Some((r.u_value_min, r.u_value_max)))
        );
    }
    let services = &view.services;
    if let Some(v) = services.ventilation {
        let _ = writeln!(out, "  ventilation       {} ({})", v.ventilation_system, v.heat_recovery);
    }
    if let Some(h) = services.space_heating {
        let _ = writeln!(out, "  space heating     {} / {}", h.main_heating, h.emission_system);
    }
    if let Some(d) = services.domestic_hot_water {
        let _ = writeln!(out, "  hot water         {}", d.dhw_system);
    }
    if let Some(i) = services.insulation {
        let _ = writeln!(
            out,
            "  heat demand       {:.2} kWh/m² (standard {:.2})",
            i.heat_demand_kwh_m2, i.standard_value_kwh_m2
        );
    }
    Ok(out)
}

/// List archetypes, eras and scenarios.
pub fn cmd_list(
    data: &ReferenceData,
    archetype: Option<&str>,
    json: bool,
) -> Result<String, AppError> {
    let views = archetype_views(data, archetype);
    if json {
        return to_json(&views);
    }

    let mut out = String::new();
    for view in &views {
        let _ = writeln!(out, "{}", view.archetype);
        for (era, scenarios) in &view.eras {
            let _ = writeln!(out, "  {era:<14}{}", scenarios.join(", "));
        }
    }
    Ok(out)
}

/// Render the load report.
pub fn cmd_validate(
    data: &ReferenceData,
    kind: Option<IssueKind>,
    json: bool,
) -> Result<String, AppError> {
    let view = issues_view(data, kind);
    if json {
        return to_json(&view);
    }
    if kind.is_none() {
        return Ok(data.issues.to_text());
    }

    let mut out = String::new();
    let _ = writeln!(out, "{} of {} data issues", view.issues.len(), view.total);
    for issue in view.issues {
        let _ = writeln!(out, "{issue}");
    }
    Ok(out)
}

/// Fail when the load report holds any warning.
pub fn check_strict(data: &ReferenceData) -> Result<(), AppError> {
    match data.issues.warning_count() {
        0 => Ok(()),
        warnings => Err(AppError::Validation(warnings)),
    }
}

/// Export to a file.
pub fn cmd_export(
    data: &ReferenceData,
    output: &Path,
    format: ExportFormat,
) -> Result<String, AppError> {
    let bytes = match format {
        ExportFormat::Json => records_to_json(&export_records(&data.envelope))?.into_bytes(),
        ExportFormat::Snapshot => encode_snapshot(data)?,
    };
    std::fs::write(output, &bytes).map_err(|source| AppError::Io {
        path: output.to_path_buf(),
        source,
    })?;
    info!(path = %output.display(), bytes = bytes.len(), ?format, "exported");
    Ok(format!(
        "exported {} records to {}\n",
        data.envelope.len(),
        output.display()
    ))
}

// =============================================================================
// ENTRY POINT
// =============================================================================

/// Run a parsed command line.
pub async fn run(cli: Cli) -> Result<(), AppError> {
    let data = cli.data_config().load()?;
    let json = cli.json;

    let output = match cli.command {
        Command::Get {
            archetype,
            era,
            scenario,
            component,
            pick,
        } => cmd_get(&data, &archetype, &era, &scenario, component, pick, json)?,
        Command::Scenario {
            archetype,
            era,
            scenario,
        } => cmd_scenario(&data, &archetype, &era, &scenario, json)?,
        Command::List { archetype } => cmd_list(&data, archetype.as_deref(), json)?,
        Command::Validate { strict, kind } => {
            let output = cmd_validate(&data, kind, json)?;
            print!("{output}");
            return if strict { check_strict(&data) } else { Ok(()) };
        }
        Command::Export { output, format } => cmd_export(&data, &output, format)?,
        Command::Serve { bind } => {
            return api::serve(AppState::new(data), bind).await;
        }
    };

    print!("{output}");
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
