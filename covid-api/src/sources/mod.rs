//! Collaborators that feed the store
//!
//! - [`daily_reports`]: per-date CSV files named `MM-DD-YYYY.csv`
//! - [`sync`]: pulls the repository the reports live in
//! - [`worldometers`]: near-real-time counters scraped from a web page

pub mod daily_reports;
pub mod sync;
pub mod worldometers;

pub use daily_reports::{DailyReports, ReportFile};
pub use sync::{RepoSync, SyncStatus};
pub use worldometers::Worldometers;

use async_trait::async_trait;
use covid_common::{LiveUpdate, Result};

/// Source of live counters applied after each refresh
#[async_trait]
pub trait LiveSource: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Fetch and parse one update
    async fn fetch(&self) -> Result<LiveUpdate>;
}
