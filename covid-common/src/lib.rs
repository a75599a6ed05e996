//! # COVID Common Library
//!
//! Core of the daily report service, shared by every binary:
//! - Location name canonicalization
//! - Row adaptation for both daily report layouts
//! - Date-indexed hierarchical store with bottom-up aggregation
//! - Live counter reconciliation on the newest date
//! - Query contract consumed by the HTTP layer
//! - Configuration loading

pub mod aggregate;
pub mod config;
pub mod dates;
pub mod error;
pub mod ingest;
pub mod live;
pub mod locale;
pub mod metrics;
pub mod query;
pub mod schema;
pub mod store;

pub use error::{Error, Result};
pub use ingest::IngestStats;
pub use live::{LiveCountry, LiveUpdate, ReconcileReport};
pub use metrics::Metrics;
pub use query::{QueryError, QueryService, Summary};
pub use schema::{NormalizedRow, RawRow};
pub use store::{DayTree, LocationPath, NodeRef, Store};
