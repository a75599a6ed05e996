//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use covid_common::dates;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    /// Newest loaded report date (`MM-DD-YYYY`)
    pub last_date: Option<String>,
    pub dates_loaded: usize,
    pub uptime_seconds: i64,
}

/// GET /health
///
/// Reports "ok" once at least one date is loaded, "loading" before that.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.store.snapshot();
    let status = if snapshot.is_empty() { "loading" } else { "ok" };

    Json(HealthResponse {
        status: status.to_string(),
        module: "covid-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        last_date: snapshot.last_date().map(dates::format_report_date),
        dates_loaded: snapshot.len(),
        uptime_seconds: (Utc::now() - state.startup_time).num_seconds(),
    })
}

/// Build health check routes
pub fn health_routes() -> axum::Router<AppState> {
    Router::new().route("/health", get(health_check))
}
