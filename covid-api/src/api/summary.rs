//! World summary endpoints
//!
//! - GET /summary                               world totals
//! - GET /summary/countries                     world totals with every country
//! - GET /summary/:start[/:end]                 world totals per day
//! - GET /summary/countries/:start[/:end]       world and countries per day
//!
//! Point queries accept `?date=YYYY-MM-DD`; ranges default `end` to the
//! newest loaded date.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use covid_common::query::{DatedSummary, Summary};
use serde::Deserialize;

use super::DateQuery;
use crate::{ApiResult, AppState};

/// Path parameters for range queries
#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub start: String,
    pub end: Option<String>,
}

/// GET /summary
pub async fn get_summary(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<Summary>> {
    Ok(Json(state.queries.summary(query.date.as_deref())?))
}

/// GET /summary/countries
pub async fn get_countries_summary(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<Summary>> {
    Ok(Json(state.queries.countries_summary(query.date.as_deref())?))
}

/// GET /summary/:start[/:end]
pub async fn get_summary_range(
    State(state): State<AppState>,
    Path(params): Path<RangeParams>,
) -> ApiResult<Json<Vec<DatedSummary>>> {
    Ok(Json(
        state
            .queries
            .summary_range(&params.start, params.end.as_deref())?,
    ))
}

/// GET /summary/countries/:start[/:end]
pub async fn get_countries_summary_range(
    State(state): State<AppState>,
    Path(params): Path<RangeParams>,
) -> ApiResult<Json<Vec<DatedSummary>>> {
    Ok(Json(
        state
            .queries
            .countries_summary_range(&params.start, params.end.as_deref())?,
    ))
}

/// Build summary routes
pub fn summary_routes() -> Router<AppState> {
    Router::new()
        .route("/summary", get(get_summary))
        .route("/summary/countries", get(get_countries_summary))
        .route("/summary/countries/:start", get(get_countries_summary_range))
        .route("/summary/countries/:start/:end", get(get_countries_summary_range))
        .route("/summary/:start", get(get_summary_range))
        .route("/summary/:start/:end", get(get_summary_range))
}
