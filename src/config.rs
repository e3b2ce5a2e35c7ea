//! Configuration management for nlq-console.
//!
//! Handles loading configuration from TOML files and environment variables:
//! the query server location and the polling cadence of the background loops.

use crate::error::{ConsoleError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default query server location.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default interval between ingestion job status polls.
pub const DEFAULT_JOB_INTERVAL_MS: u64 = 2000;

/// Default interval between system metrics polls.
pub const DEFAULT_METRICS_INTERVAL_SECS: u64 = 10;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Query server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Background polling settings.
    #[serde(default)]
    pub polling: PollingConfig,
}

/// Query server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Base URL of the server, e.g. `http://localhost:8000`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl ServerConfig {
    /// Parses and validates the base URL.
    pub fn url(&self) -> Result<Url> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| ConsoleError::config(format!("Invalid server URL: {e}")))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConsoleError::config(format!(
                "Invalid scheme '{}'. Expected 'http' or 'https'",
                url.scheme()
            )));
        }

        Ok(url)
    }
}

/// Background polling settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollingConfig {
    /// Interval between job status polls, in milliseconds.
    #[serde(default = "default_job_interval_ms")]
    pub job_interval_ms: u64,

    /// Interval between metrics polls, in seconds.
    #[serde(default = "default_metrics_interval_secs")]
    pub metrics_interval_secs: u64,
}

fn default_job_interval_ms() -> u64 {
    DEFAULT_JOB_INTERVAL_MS
}

fn default_metrics_interval_secs() -> u64 {
    DEFAULT_METRICS_INTERVAL_SECS
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            job_interval_ms: default_job_interval_ms(),
            metrics_interval_secs: default_metrics_interval_secs(),
        }
    }
}

impl PollingConfig {
    /// Returns the job poll interval.
    pub fn job_interval(&self) -> Duration {
        Duration::from_millis(self.job_interval_ms)
    }

    /// Returns the metrics poll interval.
    pub fn metrics_interval(&self) -> Duration {
        Duration::from_secs(self.metrics_interval_secs)
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nlq-console")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConsoleError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| {
            ConsoleError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Applies environment variables (NLQ_SERVER_URL, etc.) on top of file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("NLQ_SERVER_URL") {
            self.server.base_url = url;
        }
        if let Some(ms) = env_u64("NLQ_JOB_POLL_MS") {
            self.polling.job_interval_ms = ms;
        }
        if let Some(secs) = env_u64("NLQ_METRICS_SECS") {
            self.polling.metrics_interval_secs = secs;
        }
    }

    /// Checks values that serde alone cannot reject.
    pub fn validate(&self) -> Result<()> {
        self.server.url()?;
        if self.polling.job_interval_ms == 0 {
            return Err(ConsoleError::config("polling.job_interval_ms must be > 0"));
        }
        if self.polling.metrics_interval_secs == 0 {
            return Err(ConsoleError::config(
                "polling.metrics_interval_secs must be > 0",
            ));
        }
        Ok(())
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
