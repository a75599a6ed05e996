//! covid-api library interface
//!
//! HTTP query surface over the daily report store, plus the sources and the
//! refresh cycle that keep the store current.

pub mod api;
pub mod error;
pub mod refresh;
pub mod sources;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use covid_common::{QueryService, Store};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Published daily trees; refreshed in the background
    pub store: Arc<Store>,
    pub queries: QueryService,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            queries: QueryService::new(Arc::clone(&store)),
            store,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::summary_routes())
        .merge(api::country_routes())
        .merge(api::health_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
