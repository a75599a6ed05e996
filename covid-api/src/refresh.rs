//! Background refresh
//!
//! One cycle: pull the report repository, re-ingest every daily report when
//! something changed (or when forced), then overlay the live counters on the
//! newest date. Cycles never overlap; one that starts while another is still
//! running returns at once.
//!
//! Report parsing and aggregation run on the blocking pool. When a reload
//! republishes the newest date and the live fetch then fails, the last
//! successful live update is applied again so the served totals do not fall
//! back to batch figures.

use covid_common::config::ServiceConfig;
use covid_common::{Error, IngestStats, LiveUpdate, Result, Store};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::sources::daily_reports::parse_report;
use crate::sources::{DailyReports, LiveSource, RepoSync, ReportFile, Worldometers};

/// Counters for one completed cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Whether the report files were re-read this cycle
    pub reloaded: bool,
    pub dates_loaded: usize,
    pub dates_failed: usize,
    /// A fresh live update was fetched and applied
    pub live_applied: bool,
    /// The fetch failed after a reload and the previous update was applied
    /// again
    pub live_reapplied: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Another cycle was already running
    Skipped,
}

/// Clears the in-flight flag however the cycle ends
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Keeps a [`Store`] current from its sources
pub struct Refresher {
    store: Arc<Store>,
    reports: DailyReports,
    sync: Option<RepoSync>,
    live: Option<Arc<dyn LiveSource>>,
    io_timeout: Duration,
    in_flight: AtomicBool,
    last_live: Mutex<Option<LiveUpdate>>,
}

impl Refresher {
    /// Refresher reading `reports` with no sync and no live source
    pub fn new(store: Arc<Store>, reports: DailyReports, io_timeout: Duration) -> Self {
        Self {
            store,
            reports,
            sync: None,
            live: None,
            io_timeout,
            in_flight: AtomicBool::new(false),
            last_live: Mutex::new(None),
        }
    }

    pub fn with_sync(mut self, sync: RepoSync) -> Self {
        self.sync = Some(sync);
        self
    }

    pub fn with_live_source(mut self, live: Arc<dyn LiveSource>) -> Self {
        self.live = Some(live);
        self
    }

    /// Wire up the sources `config` enables
    pub fn from_config(store: Arc<Store>, config: &ServiceConfig) -> Result<Self> {
        let mut refresher = Self::new(
            store,
            DailyReports::new(&config.reports_dir),
            config.io_timeout(),
        );

        if config.sync_enabled {
            if let Some(repo_dir) = &config.repo_dir {
                refresher = refresher.with_sync(RepoSync::new(repo_dir));
            }
        }

        if config.live_enabled {
            let live = Worldometers::new(&config.live_url, config.io_timeout())?;
            refresher = refresher.with_live_source(Arc::new(live));
        }

        Ok(refresher)
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one cycle unless one is already in progress.
    ///
    /// With `force`, report files are re-read even when the sync reports
    /// nothing new.
    pub async fn run_cycle(&self, force: bool) -> CycleOutcome {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("Refresh already in progress, skipping");
            return CycleOutcome::Skipped;
        };

        let started = Instant::now();
        let mut report = CycleReport::default();

        let changed = self.sync_reports().await;
        if force || changed {
            info!(force, "Loading daily reports");
            self.load_reports(&mut report).await;
            report.reloaded = true;
        } else {
            info!("Reports already up to date, no reload needed");
        }

        self.apply_live(&mut report).await;

        info!(
            reloaded = report.reloaded,
            dates_loaded = report.dates_loaded,
            dates_failed = report.dates_failed,
            live_applied = report.live_applied,
            live_reapplied = report.live_reapplied,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Refresh cycle complete"
        );
        CycleOutcome::Completed(report)
    }

    /// Whether the reports may have changed since the last pull
    async fn sync_reports(&self) -> bool {
        let Some(sync) = &self.sync else {
            return true;
        };

        match sync.pull(self.io_timeout).await {
            Ok(status) => status.has_changes(),
            Err(e) => {
                warn!(error = %e, "Repository sync failed, reloading files on disk");
                true
            }
        }
    }

    async fn load_reports(&self, report: &mut CycleReport) {
        let files = match self.reports.list(self.io_timeout).await {
            Ok(files) => files,
            Err(e) => {
                error!(
                    dir = %self.reports.dir().display(),
                    error = %e,
                    "Cannot list daily reports"
                );
                return;
            }
        };

        for file in &files {
            match self.ingest_file(file).await {
                Ok(stats) => {
                    debug!(date = %stats.date, rows = stats.rows, nodes = stats.nodes, "Loaded report");
                    report.dates_loaded += 1;
                }
                Err(e) => {
                    warn!(path = %file.path.display(), error = %e, "Skipping daily report");
                    report.dates_failed += 1;
                }
            }
        }
    }

    /// Read one report, then parse, aggregate and publish it off the runtime
    async fn ingest_file(&self, file: &ReportFile) -> Result<IngestStats> {
        let content = self.reports.read(file, self.io_timeout).await?;

        let store = Arc::clone(&self.store);
        let task_file = file.clone();
        tokio::task::spawn_blocking(move || {
            let rows = parse_report(&task_file, &content)?;
            store.ingest_date(task_file.date, &rows)
        })
        .await
        .map_err(|e| Error::Ingestion {
            date: file.date,
            reason: format!("ingest task failed: {}", e),
        })?
    }

    async fn apply_live(&self, report: &mut CycleReport) {
        let Some(live) = &self.live else {
            return;
        };

        let fetched = match tokio::time::timeout(self.io_timeout, live.fetch()).await {
            Ok(Ok(update)) => Some(update),
            Ok(Err(e)) => {
                warn!(source = live.name(), error = %e, "Live fetch failed");
                None
            }
            Err(_) => {
                warn!(source = live.name(), timeout = ?self.io_timeout, "Live fetch timed out");
                None
            }
        };

        match fetched {
            Some(update) => match self.store.apply_live_update(&update) {
                Ok(_) => {
                    report.live_applied = true;
                    *self.last_live.lock() = Some(update);
                }
                Err(e) => warn!(source = live.name(), error = %e, "Live update not applied"),
            },
            // Without a reload the newest tree still carries the last overlay
            None if report.reloaded => {
                let previous = self.last_live.lock().clone();
                if let Some(previous) = previous {
                    match self.store.apply_live_update(&previous) {
                        Ok(_) => {
                            info!(source = live.name(), "Reapplied previous live update");
                            report.live_reapplied = true;
                        }
                        Err(e) => warn!(error = %e, "Previous live update not applied"),
                    }
                }
            }
            None => {}
        }
    }
}

/// Run a forced cycle now, then an unforced one every `period`
pub fn spawn_scheduler(refresher: Arc<Refresher>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        refresher.run_cycle(true).await;

        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if refresher.run_cycle(false).await == CycleOutcome::Skipped {
                warn!("Previous refresh still running at next tick");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_flight_guard_is_exclusive_and_released() {
        let flag = AtomicBool::new(false);

        let first = InFlight::acquire(&flag);
        assert!(first.is_some());
        assert!(InFlight::acquire(&flag).is_none());

        drop(first);
        assert!(!flag.load(Ordering::Acquire));
        assert!(InFlight::acquire(&flag).is_some());
    }

    #[tokio::test]
    async fn test_missing_reports_dir_completes_empty() {
        let dir = tempfile::tempdir().unwrap();
        let refresher = Refresher::new(
            Arc::new(Store::new()),
            DailyReports::new(dir.path().join("absent")),
            Duration::from_secs(5),
        );

        let outcome = refresher.run_cycle(true).await;

        assert_eq!(
            outcome,
            CycleOutcome::Completed(CycleReport {
                reloaded: true,
                ..CycleReport::default()
            })
        );
        assert!(!refresher.is_running());
    }
}
