//! Country and subregion endpoints
//!
//! - GET /country/:country                                  country with its subregions
//! - GET /country/:country/:start[/:end]                    country per day
//! - GET /country/:country/state/:state                     subregion with its localities
//! - GET /country/:country/state/:state/:start[/:end]       subregion per day

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use covid_common::query::{DatedSummary, Summary};
use serde::Deserialize;

use super::DateQuery;
use crate::{ApiResult, AppState};

#[derive(Debug, Deserialize)]
pub struct CountryParams {
    pub country: String,
}

#[derive(Debug, Deserialize)]
pub struct CountryRangeParams {
    pub country: String,
    pub start: String,
    pub end: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubregionParams {
    pub country: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub struct SubregionRangeParams {
    pub country: String,
    pub state: String,
    pub start: String,
    pub end: Option<String>,
}

/// GET /country/:country
pub async fn get_country(
    State(state): State<AppState>,
    Path(params): Path<CountryParams>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<Summary>> {
    Ok(Json(
        state
            .queries
            .country(&params.country, query.date.as_deref())?,
    ))
}

/// GET /country/:country/:start[/:end]
pub async fn get_country_range(
    State(state): State<AppState>,
    Path(params): Path<CountryRangeParams>,
) -> ApiResult<Json<Vec<DatedSummary>>> {
    Ok(Json(state.queries.country_range(
        &params.country,
        &params.start,
        params.end.as_deref(),
    )?))
}

/// GET /country/:country/state/:state
pub async fn get_subregion(
    State(state): State<AppState>,
    Path(params): Path<SubregionParams>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<Summary>> {
    Ok(Json(state.queries.subregion(
        &params.country,
        &params.state,
        query.date.as_deref(),
    )?))
}

/// GET /country/:country/state/:state/:start[/:end]
pub async fn get_subregion_range(
    State(state): State<AppState>,
    Path(params): Path<SubregionRangeParams>,
) -> ApiResult<Json<Vec<DatedSummary>>> {
    Ok(Json(state.queries.subregion_range(
        &params.country,
        &params.state,
        &params.start,
        params.end.as_deref(),
    )?))
}

/// Build country routes
pub fn country_routes() -> Router<AppState> {
    Router::new()
        .route("/country/:country", get(get_country))
        .route("/country/:country/state/:state", get(get_subregion))
        .route("/country/:country/state/:state/:start", get(get_subregion_range))
        .route("/country/:country/state/:state/:start/:end", get(get_subregion_range))
        .route("/country/:country/:start", get(get_country_range))
        .route("/country/:country/:start/:end", get(get_country_range))
}
