// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`.  Analysis responses are computed per
// request and marked `Cache-Control: no-store`; the dashboard that wants the
// latest completed run without triggering a new one polls `/last-run`.
//
// Error mapping follows the pipeline taxonomy: insufficient data is the
// caller's 400, an unreachable provider is a 502, and a blown run budget (or
// anything else fatal) is a 500.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::app_state::AppState;
use crate::error::PipelineError;
use crate::pipeline::{run_pipeline, run_single, RunPhase};

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/analyze", get(analyze))
        .route("/api/v1/analyze-single", get(analyze_single))
        .route("/api/v1/last-run", get(last_run))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    uptime_secs: u64,
    server_time: i64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
    })
}

// =============================================================================
// Full-watchlist analysis
// =============================================================================

#[derive(Debug, Deserialize)]
struct AnalyzeParams {
    /// Comma-separated symbols; empty or absent means the configured
    /// watchlist.
    symbols: Option<String>,
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnalyzeParams>,
) -> Response {
    let symbols = params.symbols.map(parse_symbol_csv).filter(|s| !s.is_empty());

    match run_pipeline(&state, symbols).await {
        Ok(report) => {
            state.push_run(report.clone());
            no_store(StatusCode::OK, Json(report))
        }
        Err(e) => {
            state.push_error(e.to_string());
            error_response(e)
        }
    }
}

// =============================================================================
// Single-symbol analysis
// =============================================================================

#[derive(Debug, Deserialize)]
struct AnalyzeSingleParams {
    symbol: String,
}

async fn analyze_single(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnalyzeSingleParams>,
) -> Response {
    let symbol = params.symbol.trim().to_uppercase();
    if symbol.is_empty() {
        let body = serde_json::json!({ "error": "symbol query parameter is required" });
        return no_store(StatusCode::BAD_REQUEST, Json(body));
    }

    match run_single(&state, symbol).await {
        Ok(report) => no_store(StatusCode::OK, Json(report)),
        Err(e) => {
            state.push_error(e.to_string());
            error_response(e)
        }
    }
}

// =============================================================================
// Last completed run
// =============================================================================

async fn last_run(State(state): State<Arc<AppState>>) -> Response {
    match state.last_run() {
        Some(report) => no_store(StatusCode::OK, Json(report)),
        None => {
            let body = serde_json::json!({ "error": "no completed runs yet" });
            no_store(StatusCode::NOT_FOUND, Json(body))
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Split a `symbols` query value into trimmed, upper-cased symbols.
fn parse_symbol_csv(csv: String) -> Vec<String> {
    csv.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Map a pipeline error onto its HTTP status and `{error}` body.
fn error_response(e: PipelineError) -> Response {
    let status = match &e {
        PipelineError::InsufficientData { .. } => StatusCode::BAD_REQUEST,
        PipelineError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
        PipelineError::MalformedAiResponse(_) | PipelineError::RunTimeout(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    error!(status = %status, error = %e, phase = %RunPhase::Failed, "request failed");
    let body = serde_json::json!({ "error": e.to_string() });
    no_store(status, Json(body))
}

/// Attach `Cache-Control: no-store` — analysis output must never be replayed
/// from a cache.
fn no_store(status: StatusCode, body: impl IntoResponse) -> Response {
    let mut response = (status, body).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
