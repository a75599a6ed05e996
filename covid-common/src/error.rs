//! Common error types for the COVID services

use chrono::NaiveDate;
use thiserror::Error;

/// Common result type for COVID service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the library and the service binary
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file is not valid TOML for the expected shape
    #[error("Configuration parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// One date's report could not be ingested; other dates are unaffected
    #[error("Ingestion of {date} failed: {reason}")]
    Ingestion { date: NaiveDate, reason: String },

    /// Fetch, sync or timeout failure talking to an outside source
    #[error("Network error: {0}")]
    Network(String),

    /// The live page no longer has the expected layout
    #[error("Scrape error: {0}")]
    Scrape(String),
}
