//! Daily report files
//!
//! Only files named `MM-DD-YYYY.csv` are considered; the stem is the date the
//! report describes. Other files in the directory (README, templates) are
//! ignored.

use chrono::NaiveDate;
use covid_common::{dates, Error, RawRow, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// One discovered report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFile {
    pub date: NaiveDate,
    pub path: PathBuf,
}

/// Directory of daily report CSVs
#[derive(Debug, Clone)]
pub struct DailyReports {
    dir: PathBuf,
}

impl DailyReports {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reports in the directory, oldest first. The whole listing is bounded
    /// by `timeout`.
    pub async fn list(&self, timeout: Duration) -> Result<Vec<ReportFile>> {
        let mut files = tokio::time::timeout(timeout, self.scan())
            .await
            .map_err(|_| {
                Error::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("listing {} timed out after {:?}", self.dir.display(), timeout),
                ))
            })??;

        files.sort_by_key(|file| file.date);
        Ok(files)
    }

    async fn scan(&self) -> Result<Vec<ReportFile>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            match report_date(&path) {
                Some(date) => files.push(ReportFile { date, path }),
                None => debug!(path = %path.display(), "Ignoring non-report file"),
            }
        }
        Ok(files)
    }

    /// Raw contents of one report, bounded by `timeout`
    pub async fn read(&self, file: &ReportFile, timeout: Duration) -> Result<String> {
        let content = tokio::time::timeout(timeout, tokio::fs::read_to_string(&file.path))
            .await
            .map_err(|_| Error::Ingestion {
                date: file.date,
                reason: format!("reading {} timed out after {:?}", file.path.display(), timeout),
            })??;
        Ok(content)
    }
}

/// Tokenize one report's contents. CPU-bound; callers on the runtime should
/// run it on a blocking thread.
pub fn parse_report(file: &ReportFile, content: &str) -> Result<Vec<RawRow>> {
    parse_csv(content).map_err(|err| Error::Ingestion {
        date: file.date,
        reason: format!("malformed CSV in {}: {}", file.path.display(), err),
    })
}

/// Date for a `MM-DD-YYYY.csv` path
pub fn report_date(path: &Path) -> Option<NaiveDate> {
    if path.extension()?.to_str()? != "csv" {
        return None;
    }
    dates::parse_report_stem(path.file_stem()?.to_str()?)
}

/// Header-keyed rows. Header names lose any BOM and surrounding whitespace;
/// short records simply lack the trailing columns.
pub fn parse_csv(content: &str) -> std::result::Result<Vec<RawRow>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    reader
        .records()
        .map(|record| {
            let record = record?;
            Ok(headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect())
        })
        .collect()
}
