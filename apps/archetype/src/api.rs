//! # HTTP API
//!
//! Read-only lookup service over the loaded reference data.
//!
//! Routes:
//! - `GET /health`
//! - `GET /envelope?archetype&era&scenario&component[&pick]`
//! - `GET /scenario?archetype&era&scenario`
//! - `GET /archetypes`
//! - `GET /issues[?kind]`
//!
//! The state is an `Arc` of immutable tables, so handlers never lock.

use crate::AppError;
use crate::response::{archetype_views, envelope_view, issues_view, scenario_view};
use archetype_core::{Component, IssueKind, LookupError, PickStrategy, ReferenceData};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

// =============================================================================
// STATE
// =============================================================================

#[derive(Clone)]
pub struct AppState {
    pub data: Arc<ReferenceData>,
}

impl AppState {
    #[must_use]
    pub fn new(data: Arc<ReferenceData>) -> Self {
        Self { data }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// JSON error body with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: err.to_string(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct EnvelopeQuery {
    pub archetype: String,
    pub era: String,
    pub scenario: String,
    pub component: String,
    pub pick: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ScenarioQuery {
    pub archetype: String,
    pub era: String,
    pub scenario: String,
}

#[derive(Debug, Deserialize)]
pub struct IssuesQuery {
    pub kind: Option<String>,
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "records": state.data.envelope.len(),
        "issues": state.data.issues.len(),
    }))
}

async fn envelope(
    State(state): State<AppState>,
    query: Result<Query<EnvelopeQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(q) = query?;
    let component = q
        .component
        .parse::<Component>()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let pick = q
        .pick
        .as_deref()
        .map(str::parse::<PickStrategy>)
        .transpose()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let view = envelope_view(&state.data, &q.archetype, &q.era, &q.scenario, component, pick)?;
    Ok(Json(view).into_response())
}

async fn scenario(
    State(state): State<AppState>,
    query: Result<Query<ScenarioQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(q) = query?;
    let view = scenario_view(&state.data, &q.archetype, &q.era, &q.scenario)?;
    Ok(Json(view).into_response())
}

async fn archetypes(State(state): State<AppState>) -> Response {
    Json(archetype_views(&state.data, None)).into_response()
}

async fn issues(
    State(state): State<AppState>,
    query: Result<Query<IssuesQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(q) = query?;
    let kind = q
        .kind
        .as_deref()
        .map(str::parse::<IssueKind>)
        .transpose()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(Json(issues_view(&state.data, kind)).into_response())
}

// =============================================================================
// ROUTER & SERVER
// =============================================================================

/// Build the router with tracing and CORS layers.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/health", get(health))
        .route("/envelope", get(envelope))
        .route("/scenario", get(scenario))
        .route("/archetypes", get(archetypes))
        .route("/issues", get(issues))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Serve until Ctrl-C.
pub async fn serve(state: AppState, bind: SocketAddr) -> Result<(), AppError> {
    let records = state.data.envelope.len();
    let listener = TcpListener::bind(bind).await.map_err(AppError::Server)?;
    info!(%bind, records, "lookup server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed to install Ctrl-C handler: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
