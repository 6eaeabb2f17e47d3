//! Configuration module for Slaintrack Monitor.
//!
//! This module handles parsing configuration from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `SLAINTRACK_SERVER_URL` | Yes | - | Collector base URL (e.g., `https://slaintrack.example.com`) |
//! | `SLAINTRACK_API_KEY` | Yes | - | Bearer credential for the collector |
//! | `SLAINTRACK_LOG_PATH` | Yes | - | Game log file to tail |
//! | `SLAINTRACK_POLL_INTERVAL_MS` | No | 1000 | Log polling cadence |
//! | `SLAINTRACK_CORRELATION_WINDOW_MS` | No | 2000 | How long non-PVP kills wait for a PVP broadcast |
//! | `SLAINTRACK_EVENT_TIMEZONE` | No | `-05:00` | Timezone literal sent with scheduled-event reports |
//!
//! Required values that are unset load as empty strings. The tracker reports
//! them as `missing_config` when a watch is started, so the settings shell can
//! load a partial configuration and fill in the rest.
//!
//! # Example
//!
//! ```no_run
//! use slaintrack_monitor::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Server URL: {}", config.base_url());
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::correlator::DEFAULT_CORRELATION_WINDOW_MS;
use crate::reporter::DEFAULT_EVENT_TIMEZONE;

/// Default polling cadence in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

const ENV_SERVER_URL: &str = "SLAINTRACK_SERVER_URL";
const ENV_API_KEY: &str = "SLAINTRACK_API_KEY";
const ENV_LOG_PATH: &str = "SLAINTRACK_LOG_PATH";
const ENV_POLL_INTERVAL_MS: &str = "SLAINTRACK_POLL_INTERVAL_MS";
const ENV_CORRELATION_WINDOW_MS: &str = "SLAINTRACK_CORRELATION_WINDOW_MS";
const ENV_EVENT_TIMEZONE: &str = "SLAINTRACK_EVENT_TIMEZONE";

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Configuration for a watch session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Collector base URL as entered; see [`Config::base_url`].
    pub server_url: String,

    /// Bearer credential for the collector.
    pub api_key: String,

    /// Game log file to tail.
    pub log_path: PathBuf,

    /// Log polling cadence.
    pub poll_interval: Duration,

    /// How long a non-PVP kill waits for a superseding PVP broadcast.
    pub correlation_window: Duration,

    /// Timezone literal sent with scheduled-event reports.
    pub event_timezone: String,
}

impl Config {
    /// Creates a configuration with default timings.
    #[must_use]
    pub fn new(
        server_url: impl Into<String>,
        api_key: impl Into<String>,
        log_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            server_url: server_url.into(),
            api_key: api_key.into(),
            log_path: log_path.into(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            correlation_window: Duration::from_millis(DEFAULT_CORRELATION_WINDOW_MS),
            event_timezone: DEFAULT_EVENT_TIMEZONE.to_string(),
        }
    }

    /// Sets the polling cadence.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the correlation window.
    #[must_use]
    pub fn with_correlation_window(mut self, window: Duration) -> Self {
        self.correlation_window = window;
        self
    }

    /// Sets the scheduled-event timezone literal.
    #[must_use]
    pub fn with_event_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.event_timezone = timezone.into();
        self
    }

    /// Creates a new `Config` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a timing variable is set but is
    /// not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_url = env::var(ENV_SERVER_URL).unwrap_or_default();
        let api_key = env::var(ENV_API_KEY).unwrap_or_default();
        let log_path = env::var(ENV_LOG_PATH).unwrap_or_default();

        let poll_interval_ms = parse_positive_ms(ENV_POLL_INTERVAL_MS, DEFAULT_POLL_INTERVAL_MS)?;
        let correlation_window_ms =
            parse_positive_ms(ENV_CORRELATION_WINDOW_MS, DEFAULT_CORRELATION_WINDOW_MS)?;

        let event_timezone = env::var(ENV_EVENT_TIMEZONE)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_EVENT_TIMEZONE.to_string());

        Ok(Self::new(server_url.trim(), api_key.trim(), log_path.trim())
            .with_poll_interval(Duration::from_millis(poll_interval_ms))
            .with_correlation_window(Duration::from_millis(correlation_window_ms))
            .with_event_timezone(event_timezone))
    }

    /// Returns the names of required settings that are empty.
    ///
    /// An empty vector means a watch can be started.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.server_url.trim().is_empty() {
            missing.push("server_url");
        }
        if self.api_key.trim().is_empty() {
            missing.push("api_key");
        }
        if self.log_path.as_os_str().is_empty() {
            missing.push("log_path");
        }
        missing
    }

    /// Returns the server URL without trailing slashes.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.server_url.trim().trim_end_matches('/')
    }
}

/// Parses a millisecond duration variable, which must be greater than zero.
fn parse_positive_ms(key: &str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(val) => {
            let ms = val
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("expected positive integer, got '{val}'"),
                })?;
            if ms == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "value must be greater than 0".to_string(),
                });
            }
            Ok(ms)
        }
        Err(_) => Ok(default),
    }
}
