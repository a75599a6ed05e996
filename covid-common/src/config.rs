//! Configuration loading
//!
//! Configuration file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. `COVID_CONFIG` environment variable
//! 3. Platform config file (`<config dir>/covid-tracker/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A file named on the command line or in the environment that does not
//! exist is not fatal: the service logs a warning and starts on defaults.
//! A file that exists but does not parse is an error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, Result};

/// Environment variable naming the configuration file
pub const CONFIG_ENV_VAR: &str = "COVID_CONFIG";

const CONFIG_DIR_NAME: &str = "covid-tracker";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Directory holding `MM-DD-YYYY.csv` daily reports
    pub reports_dir: PathBuf,
    /// Git checkout the reports live in; pulled before each refresh
    pub repo_dir: Option<PathBuf>,
    pub sync_enabled: bool,
    /// HTTP listen address
    pub bind_addr: String,
    pub refresh_interval_secs: u64,
    /// Upper bound on every sync, file read and live fetch
    pub io_timeout_secs: u64,
    pub live_enabled: bool,
    pub live_url: String,
    /// Default tracing directive when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            reports_dir: PathBuf::from("./COVID-19/csse_covid_19_data/csse_covid_19_daily_reports"),
            repo_dir: Some(PathBuf::from("./COVID-19")),
            sync_enabled: true,
            bind_addr: "127.0.0.1:8080".to_string(),
            refresh_interval_secs: 15 * 60,
            io_timeout_secs: 30,
            live_enabled: true,
            live_url: "https://www.worldometers.info/coronavirus/".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs.max(1))
    }

    fn validate(self) -> Result<Self> {
        if self.bind_addr.trim().is_empty() {
            return Err(Error::Config("bind_addr must not be empty".to_string()));
        }
        if self.live_enabled && self.live_url.trim().is_empty() {
            return Err(Error::Config(
                "live_url must be set when live_enabled is true".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// Named file did not exist; compiled defaults used
    MissingFile(PathBuf),
    /// No file named or found; compiled defaults used
    Defaults,
}

/// Configuration plus its provenance, for logging once tracing is up
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ServiceConfig,
    pub source: ConfigSource,
}

/// Pick the configuration file path by priority
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory, only if the file is there
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .filter(|path| path.exists())
}

/// Resolve and load configuration, falling back to defaults when no file is
/// available
pub fn load_config(cli_arg: Option<&Path>) -> Result<LoadedConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) if path.exists() => Ok(LoadedConfig {
            config: load_config_file(&path)?,
            source: ConfigSource::File(path),
        }),
        Some(path) => Ok(LoadedConfig {
            config: ServiceConfig::default(),
            source: ConfigSource::MissingFile(path),
        }),
        None => Ok(LoadedConfig {
            config: ServiceConfig::default(),
            source: ConfigSource::Defaults,
        }),
    }
}

/// Parse one TOML file; missing keys take their defaults
pub fn load_config_file(path: &Path) -> Result<ServiceConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<ServiceConfig> {
    let config: ServiceConfig = toml::from_str(content)?;
    config.validate()
}
