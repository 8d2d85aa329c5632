//! Integration tests for archetype CLI commands.
//!
//! Uses tempfile for testing file-based operations.

#![allow(clippy::unwrap_used, clippy::panic)]

use archetype::cli::{
    ExportFormat, check_strict, cmd_export, cmd_get, cmd_list, cmd_scenario, cmd_validate,
};
use archetype::config::DataConfig;
use archetype::{AppError, archetype_core};
use archetype_core::{Component, IssueKind, PickStrategy, ReferenceData};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn embedded() -> Arc<ReferenceData> {
    DataConfig::default().load().unwrap()
}

/// Write a small source document with one duplicate key.
fn create_source_json(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("source.json");
    let content = r#"{
        "source": "test_envelope",
        "envelope": [
            {"line": 1, "path": ["Test House", "1950-1960", "scenario1"], "component": "doors",
             "area_m2": 4.0, "u_value_range": [2.0, 3.0]},
            {"line": 2, "path": ["Test House", "1950-1960", "scenario1"], "component": "solid_wall",
             "area_m2": 80.0, "r_value_range": [0.5, 1.0], "u_value_range": [0.8, 1.4]},
            {"line": 3, "path": ["Test House", "1950-1960", "scenario1"], "component": "doors",
             "area_m2": 5.0, "u_value_range": [2.0, 3.0]}
        ]
    }"#;
    std::fs::write(&path, content).unwrap();
    path
}

fn create_overrides_json(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("overrides.json");
    let content = r#"[
        {"archetype": "Test House", "component": "doors", "param_name": "u_value",
         "fixed_value": 1.1}
    ]"#;
    std::fs::write(&path, content).unwrap();
    path
}

fn load_file(dataset: PathBuf, overrides: Option<PathBuf>) -> Arc<ReferenceData> {
    DataConfig {
        dataset: Some(dataset),
        overrides,
        ..DataConfig::default()
    }
    .load()
    .unwrap()
}

// =============================================================================
// GET COMMAND TESTS
// =============================================================================

#[test]
fn test_get_text_output() {
    let data = embedded();
    let out = cmd_get(
        &data,
        "Corner Townhouse",
        "<1946",
        "scenario1",
        Component::Doors,
        None,
        false,
    )
    .unwrap();
    assert!(out.contains("pre_calibration"));
    assert!(out.contains("7.73"));
    assert!(out.contains("r_value_range  -"));
}

#[test]
fn test_get_json_with_pick() {
    let data = embedded();
    let out = cmd_get(
        &data,
        "Corner townhouse",
        "1965-1974",
        "scenario1",
        Component::GroundFloor,
        Some(PickStrategy::Midpoint),
        true,
    )
    .unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["area_m2"], 50.0);
    assert_eq!(value["r_value_min"], 0.17);
    assert_eq!(value["picked"]["u_value"], 2.33);
    assert_eq!(value["source"]["source"], "building_envelope");
}

#[test]
fn test_get_unknown_key_is_lookup_error() {
    let data = embedded();
    let result = cmd_get(
        &data,
        "Lighthouse",
        "<1946",
        "scenario1",
        Component::Doors,
        None,
        false,
    );
    assert!(matches!(result, Err(AppError::Lookup(_))));
}

// =============================================================================
// SCENARIO / LIST COMMAND TESTS
// =============================================================================

#[test]
fn test_scenario_lists_components() {
    let data = embedded();
    let out = cmd_scenario(&data, "Corner Townhouse", "<1946", "scenario1", false).unwrap();
    for component in Component::ALL {
        assert!(out.contains(component.as_str()), "missing {component}");
    }
}

#[test]
fn test_scenario_json() {
    let data = embedded();
    let out = cmd_scenario(&data, "Corner Townhouse", "<1946", "scenario1", true).unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["components"].as_array().map(Vec::len), Some(5));
}

#[test]
fn test_list_all_and_filtered() {
    let data = embedded();
    let all = cmd_list(&data, None, false).unwrap();
    assert!(all.contains("Detached house"));
    assert!(all.contains("Corner Townhouse"));

    let one = cmd_list(&data, Some("Detached house"), false).unwrap();
    assert!(one.contains("Detached house"));
    assert!(!one.contains("Corner Townhouse"));

    let none = cmd_list(&data, Some("Lighthouse"), true).unwrap();
    assert_eq!(none.trim(), "[]");
}

// =============================================================================
// VALIDATE COMMAND TESTS
// =============================================================================

#[test]
fn test_validate_text_report() {
    let data = embedded();
    let out = cmd_validate(&data, None, false).unwrap();
    assert!(out.contains("conflicting_duplicate"));
}

#[test]
fn test_validate_filtered_by_kind() {
    let dir = create_temp_dir();
    let data = load_file(create_source_json(&dir), None);

    let out = cmd_validate(&data, Some(IssueKind::ConflictingDuplicate), true).unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    let issues = value["issues"].as_array().unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0]["kind"], "conflicting_duplicate");
}

#[test]
fn test_strict_fails_on_embedded_warnings() {
    let data = embedded();
    let result = check_strict(&data);
    assert!(matches!(result, Err(AppError::Validation(n)) if n == data.issues.warning_count()));
    assert!(data.issues.warning_count() < data.issues.len());
}

#[test]
fn test_strict_passes_clean_dataset() {
    let dir = create_temp_dir();
    let path = dir.path().join("clean.json");
    let content = r#"[{"archetype": "Test House", "era": "pre-war", "scenario": "baseline",
        "component": "doors", "area_m2": 2.0, "u_value_min": 1.4, "u_value_max": 1.4}]"#;
    std::fs::write(&path, content).unwrap();

    let data = load_file(path, None);
    assert_eq!(data.envelope.len(), 1);
    assert!(check_strict(&data).is_ok());
}

#[test]
fn test_widened_band_loads_fewer_mismatches() {
    let narrow = embedded();
    let wide = DataConfig {
        validation: archetype_core::ValidationConfig {
            surface_resistance_min: -10.0,
            surface_resistance_max: 10.0,
        },
        ..DataConfig::default()
    }
    .load()
    .unwrap();
    assert!(narrow.issues.count(IssueKind::ReciprocalMismatch) > 0);
    assert!(
        wide.issues.count(IssueKind::ReciprocalMismatch)
            < narrow.issues.count(IssueKind::ReciprocalMismatch)
    );
}

// =============================================================================
// FILE DATASET TESTS
// =============================================================================

#[test]
fn test_source_file_last_write_wins() {
    let dir = create_temp_dir();
    let data = load_file(create_source_json(&dir), None);

    let record = data
        .get_envelope("Test House", "1950-1960", "scenario1", Component::Doors)
        .unwrap();
    assert!((record.area_m2 - 5.0).abs() < f64::EPSILON);
    assert_eq!(data.envelope.len(), 2);
}

#[test]
fn test_overrides_file_applies() {
    let dir = create_temp_dir();
    let data = load_file(create_source_json(&dir), Some(create_overrides_json(&dir)));

    let out = cmd_get(
        &data,
        "Test House",
        "1950-1960",
        "scenario1",
        Component::Doors,
        None,
        true,
    )
    .unwrap();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["u_value_min"], 1.1);
    assert_eq!(value["u_value_max"], 1.1);
    assert_eq!(value["source"]["source"], "overrides");
    assert_eq!(value["source"]["line"], 1);
}

#[test]
fn test_invalid_overrides_file_fails() {
    let dir = create_temp_dir();
    let overrides = dir.path().join("bad.json");
    std::fs::write(&overrides, r#"[{"param_name": "area_m2", "min_val": 1.0}]"#).unwrap();

    let result = DataConfig {
        dataset: Some(create_source_json(&dir)),
        overrides: Some(overrides),
        ..DataConfig::default()
    }
    .load();
    assert!(matches!(result, Err(AppError::Override(_))));
}

#[test]
fn test_garbage_dataset_fails() {
    let dir = create_temp_dir();
    let path = dir.path().join("garbage.bin");
    std::fs::write(&path, [0xff, 0x00, 0x13, 0x37]).unwrap();

    let result = DataConfig {
        dataset: Some(path),
        ..DataConfig::default()
    }
    .load();
    assert!(matches!(result, Err(AppError::Data(_))));
}

// =============================================================================
// EXPORT COMMAND TESTS
// =============================================================================

#[test]
fn test_export_json_reloads() {
    let dir = create_temp_dir();
    let data = embedded();
    let path = dir.path().join("envelope.json");

    let out = cmd_export(&data, &path, ExportFormat::Json).unwrap();
    assert!(out.contains("exported"));

    let reloaded = load_file(path, None);
    assert_eq!(reloaded.envelope.len(), data.envelope.len());
    assert_eq!(
        reloaded
            .get_envelope("Corner Townhouse", "<1946", "scenario1", Component::Doors)
            .unwrap()
            .area_m2,
        7.73
    );
}

#[test]
fn test_export_snapshot_reloads() {
    let dir = create_temp_dir();
    let data = embedded();
    let path = dir.path().join("envelope.snapshot");

    cmd_export(&data, &path, ExportFormat::Snapshot).unwrap();

    let reloaded = load_file(path, None);
    assert_eq!(reloaded.envelope, data.envelope);
    assert_eq!(reloaded.issues.len(), data.issues.len());
}

#[test]
fn test_export_to_missing_directory_fails() {
    let data = embedded();
    let path = PathBuf::from("/nonexistent/dir/envelope.json");
    let result = cmd_export(&data, &path, ExportFormat::Json);
    assert!(matches!(result, Err(AppError::Io { .. })));
}
