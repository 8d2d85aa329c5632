//! Integration tests for the HTTP lookup API.

#![allow(clippy::unwrap_used, clippy::panic)]

use archetype::api::{AppState, router};
use archetype::config::DataConfig;
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::Value;

fn server() -> TestServer {
    let data = DataConfig::default().load().unwrap();
    TestServer::new(router(AppState::new(data))).unwrap()
}

#[tokio::test]
async fn test_health_reports_counts() {
    let response = server().get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert!(body["records"].as_u64().unwrap() > 0);
    assert!(body["issues"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_envelope_lookup() {
    let response = server()
        .get("/envelope")
        .add_query_param("archetype", "Corner Townhouse")
        .add_query_param("era", "<1946")
        .add_query_param("scenario", "scenario1")
        .add_query_param("component", "doors")
        .add_query_param("pick", "upper")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["calibration_stage"], "pre_calibration");
    assert_eq!(body["area_m2"], 7.73);
    assert_eq!(body["picked"]["u_value"], 1.4);
    assert!(body.get("r_value_min").is_none_or(Value::is_null));
}

#[tokio::test]
async fn test_envelope_unknown_key_is_404() {
    let response = server()
        .get("/envelope")
        .add_query_param("archetype", "Lighthouse")
        .add_query_param("era", "<1946")
        .add_query_param("scenario", "scenario1")
        .add_query_param("component", "doors")
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("Lighthouse"));
}

#[tokio::test]
async fn test_envelope_bad_component_is_400() {
    let response = server()
        .get("/envelope")
        .add_query_param("archetype", "Corner Townhouse")
        .add_query_param("era", "<1946")
        .add_query_param("scenario", "scenario1")
        .add_query_param("component", "chimney")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_envelope_bad_pick_is_400() {
    let response = server()
        .get("/envelope")
        .add_query_param("archetype", "Corner Townhouse")
        .add_query_param("era", "<1946")
        .add_query_param("scenario", "scenario1")
        .add_query_param("component", "doors")
        .add_query_param("pick", "random")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_scenario_lookup() {
    let response = server()
        .get("/scenario")
        .add_query_param("archetype", "Corner Townhouse")
        .add_query_param("era", "<1946")
        .add_query_param("scenario", "scenario1")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["components"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn test_archetypes_listing() {
    let response = server().get("/archetypes").await;
    response.assert_status_ok();
    let body: Value = response.json();
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|v| v["archetype"].as_str())
        .collect();
    assert!(names.contains(&"Detached house"));
    assert!(names.contains(&"Corner townhouse"));
}

#[tokio::test]
async fn test_issues_filter() {
    let server = server();

    let response = server
        .get("/issues")
        .add_query_param("kind", "conflicting_duplicate")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    let issues = body["issues"].as_array().unwrap();
    assert!(!issues.is_empty());
    assert!(issues.iter().all(|i| i["kind"] == "conflicting_duplicate"));

    server
        .get("/issues")
        .add_query_param("kind", "typo")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_query_parameter_is_json_400() {
    let response = server()
        .get("/envelope")
        .add_query_param("archetype", "Corner Townhouse")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].is_string());
}
