//! covid-api - COVID-19 daily report query service
//!
//! Loads the per-date daily reports into an in-memory hierarchical store,
//! keeps it current in the background and serves point and range queries
//! over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use covid_common::config::{self, ConfigSource, CONFIG_ENV_VAR};
use covid_common::Store;
use covid_api::refresh::{spawn_scheduler, Refresher};
use covid_api::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments; each overrides the matching configuration field
#[derive(Parser, Debug)]
#[command(name = "covid-api", version, about = "COVID-19 daily report query service")]
struct Args {
    /// Configuration file
    #[arg(long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Directory of MM-DD-YYYY.csv daily reports
    #[arg(long, env = "COVID_REPORTS_DIR")]
    reports_dir: Option<PathBuf>,

    /// HTTP listen address
    #[arg(long, env = "COVID_BIND")]
    bind: Option<String>,

    /// Do not fetch live counters
    #[arg(long)]
    no_live: bool,

    /// Do not pull the report repository
    #[arg(long)]
    no_sync: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let loaded = config::load_config(args.config.as_deref()).context("loading configuration")?;
    let mut config = loaded.config;
    if let Some(dir) = args.reports_dir {
        config.reports_dir = dir;
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if args.no_live {
        config.live_enabled = false;
    }
    if args.no_sync {
        config.sync_enabled = false;
    }

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Build identification first, before any slow loading
    info!(
        "Starting covid-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    match &loaded.source {
        ConfigSource::File(path) => info!("Configuration loaded from {}", path.display()),
        ConfigSource::MissingFile(path) => warn!(
            "Configuration file {} not found, using defaults",
            path.display()
        ),
        ConfigSource::Defaults => info!("No configuration file, using defaults"),
    }
    info!(
        reports_dir = %config.reports_dir.display(),
        sync = config.sync_enabled,
        live = config.live_enabled,
        refresh_secs = config.refresh_interval().as_secs(),
        "Effective configuration"
    );

    let store = Arc::new(Store::new());
    let refresher = Arc::new(
        Refresher::from_config(Arc::clone(&store), &config).context("building refresher")?,
    );
    let _scheduler = spawn_scheduler(refresher, config.refresh_interval());

    let state = AppState::new(store);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!("covid-api listening on http://{}", config.bind_addr);
    info!("Health check: http://{}/health", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
