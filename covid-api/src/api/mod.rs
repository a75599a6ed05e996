//! HTTP API handlers for covid-api

pub mod country;
pub mod health;
pub mod summary;

pub use country::country_routes;
pub use health::health_routes;
pub use summary::summary_routes;

use serde::Deserialize;

/// `?date=YYYY-MM-DD` on point queries; latest date when absent
#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}
