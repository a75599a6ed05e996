//! Repository sync
//!
//! The daily reports live in a git checkout. Pulling it tells the refresh
//! cycle whether anything changed since the last pull.

use covid_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

const UP_TO_DATE_MARKER: &str = "Already up to date.";

/// Result of one pull
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// New commits arrived
    Updated,
    /// Nothing new upstream
    UpToDate,
    /// No checkout to pull; files on disk are used as they are
    Unavailable,
}

impl SyncStatus {
    /// Whether report files should be re-read
    pub fn has_changes(self) -> bool {
        !matches!(self, SyncStatus::UpToDate)
    }
}

/// Pulls the report repository
#[derive(Debug, Clone)]
pub struct RepoSync {
    repo_dir: PathBuf,
}

impl RepoSync {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    /// Run `git pull` in the checkout, bounded by `timeout`
    pub async fn pull(&self, timeout: Duration) -> Result<SyncStatus> {
        if !self.repo_dir.join(".git").exists() {
            warn!(
                repo = %self.repo_dir.display(),
                "Report directory is not a git checkout, skipping sync"
            );
            return Ok(SyncStatus::Unavailable);
        }

        let child = Command::new("git")
            .arg("pull")
            .current_dir(&self.repo_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| Error::Network(format!("git pull timed out after {:?}", timeout)))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(Error::Network(format!(
                "git pull exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let status = classify_pull_output(&stdout);
        debug!(repo = %self.repo_dir.display(), ?status, "git pull finished");
        Ok(status)
    }
}

/// Read the outcome from `git pull` output
pub fn classify_pull_output(output: &str) -> SyncStatus {
    if output.contains(UP_TO_DATE_MARKER) {
        SyncStatus::UpToDate
    } else {
        SyncStatus::Updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_up_to_date() {
        assert_eq!(classify_pull_output("Already up to date.\n"), SyncStatus::UpToDate);
    }

    #[test]
    fn test_classify_fast_forward() {
        let output = "Updating 1a2b3c4..5d6e7f8\nFast-forward\n \
                      csse_covid_19_data/csse_covid_19_daily_reports/04-01-2020.csv | 3 +++\n";
        assert_eq!(classify_pull_output(output), SyncStatus::Updated);
    }

    #[test]
    fn test_only_up_to_date_skips_reload() {
        assert!(SyncStatus::Updated.has_changes());
        assert!(SyncStatus::Unavailable.has_changes());
        assert!(!SyncStatus::UpToDate.has_changes());
    }

    #[tokio::test]
    async fn test_pull_without_checkout_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let status = RepoSync::new(dir.path())
            .pull(Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(status, SyncStatus::Unavailable);
    }
}
