//! HTTP reporter for Slaintrack Monitor.
//!
//! This module talks to the collector:
//!
//! | Call | Endpoint | Auth |
//! |------|----------|------|
//! | [`Reporter::check_health`] | `GET /api/health` | none |
//! | [`Reporter::check_api_key`] | `GET /api/auth/api-key` | bearer |
//! | [`Reporter::report_kill`] | `POST /api/slain` | bearer |
//! | [`Reporter::report_scheduled_event`] | `POST /api/earthquake` | bearer |
//!
//! Every call is independent and nothing is retried. A failed report is simply
//! lost; the next log line produces a fresh attempt.
//!
//! # Example
//!
//! ```no_run
//! use slaintrack_monitor::reporter::{ReportOutcome, Reporter};
//! use slaintrack_monitor::types::KillEvent;
//!
//! #[tokio::main]
//! async fn main() {
//!     let reporter = Reporter::new("https://collector.example.com", "secret").unwrap();
//!
//!     let result = reporter.report_kill(&KillEvent::new("Grimrod", true)).await;
//!     println!("{}", ReportOutcome::from_result(&result));
//! }
//! ```

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::status::ConnectionState;
use crate::types::{EarthquakePayload, KillEvent, SlainPayload};

/// Upper bound on the preflight health check.
pub const HEALTH_CHECK_TIMEOUT_SECS: u64 = 8;

/// Client-wide request timeout.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default literal timezone sent with scheduled-event reports.
pub const DEFAULT_EVENT_TIMEZONE: &str = "-05:00";

const HEALTH_PATH: &str = "/api/health";
const API_KEY_PATH: &str = "/api/auth/api-key";
const SLAIN_PATH: &str = "/api/slain";
const EARTHQUAKE_PATH: &str = "/api/earthquake";

/// Errors that can occur while talking to the collector.
#[derive(Error, Debug)]
pub enum ReporterError {
    /// Transport failure (connection refused, DNS, reset, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request did not finish within its bound.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The collector rejected the API key (401).
    #[error("authentication failed: invalid API key")]
    Unauthorized,

    /// The collector answered with a non-2xx status other than 401.
    #[error("server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// A 2xx response whose body is not JSON.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The API key contains characters not allowed in a header.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

/// Connection-status outcome of a single collector call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// 2xx.
    Connected,
    /// 401.
    InvalidKey,
    /// Anything else.
    Error,
}

impl ReportOutcome {
    /// Maps a collector call result to its outcome.
    #[must_use]
    pub fn from_result<T>(result: &Result<T, ReporterError>) -> Self {
        match result {
            Ok(_) => Self::Connected,
            Err(ReporterError::Unauthorized) => Self::InvalidKey,
            Err(_) => Self::Error,
        }
    }

    /// The connection state this outcome signals.
    #[must_use]
    pub fn state(self) -> ConnectionState {
        match self {
            Self::Connected => ConnectionState::Connected,
            Self::InvalidKey => ConnectionState::InvalidKey,
            Self::Error => ConnectionState::Error,
        }
    }
}

impl fmt::Display for ReportOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.state().as_str())
    }
}

/// Client for the collector API.
#[derive(Debug, Clone)]
pub struct Reporter {
    client: Client,
    base_url: String,
    api_key: String,
    event_timezone: String,
    health_timeout: Duration,
}

impl Reporter {
    /// Creates a reporter for `base_url`, authenticating with `api_key`.
    ///
    /// Trailing slashes on `base_url` are removed.
    ///
    /// # Errors
    ///
    /// Returns `ReporterError::Http` if the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ReporterError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .pool_max_idle_per_host(4)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            event_timezone: DEFAULT_EVENT_TIMEZONE.to_string(),
            health_timeout: Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS),
        })
    }

    /// Overrides the timezone literal sent with scheduled-event reports.
    #[must_use]
    pub fn with_event_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.event_timezone = timezone.into();
        self
    }

    /// Overrides the health check bound.
    #[must_use]
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// Returns the normalized collector base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Preflight: is the collector reachable?
    ///
    /// # Errors
    ///
    /// `Timeout` if no response arrives within the health bound, `Http` on
    /// transport failure, `ServerError` on a non-2xx status.
    pub async fn check_health(&self) -> Result<(), ReporterError> {
        let url = self.url(HEALTH_PATH);
        debug!(url = %url, "Checking collector health");

        let request = self.client.get(&url).send();
        let response = tokio::time::timeout(self.health_timeout, request)
            .await
            .map_err(|_| ReporterError::Timeout(self.health_timeout))??;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(ReporterError::ServerError {
            status: status.as_u16(),
            message,
        })
    }

    /// Preflight: does the collector accept the API key?
    ///
    /// # Errors
    ///
    /// `Unauthorized` on 401; any other failure as in [`Self::check_health`].
    pub async fn check_api_key(&self) -> Result<(), ReporterError> {
        let url = self.url(API_KEY_PATH);
        debug!(url = %url, "Validating API key");

        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .send()
            .await?;

        classify(response).await.map(|_| ())
    }

    /// Reports a confirmed kill.
    ///
    /// # Errors
    ///
    /// `Unauthorized` on 401, `ServerError` on other non-2xx statuses,
    /// `MalformedResponse` if a 2xx body is not JSON, `Http` on transport
    /// failure.
    pub async fn report_kill(&self, event: &KillEvent) -> Result<(), ReporterError> {
        let payload = SlainPayload::from(event);
        self.post(SLAIN_PATH, &payload).await?;
        info!(npc = %event.npc_name, pvp = event.is_pvp, "Kill reported");
        Ok(())
    }

    /// Reports a scheduled-event announcement using the raw log line.
    ///
    /// # Errors
    ///
    /// As for [`Self::report_kill`].
    pub async fn report_scheduled_event(&self, raw_line: &str) -> Result<(), ReporterError> {
        let payload = EarthquakePayload {
            log_line: raw_line.to_string(),
            timezone: self.event_timezone.clone(),
        };
        self.post(EARTHQUAKE_PATH, &payload).await?;
        info!("Scheduled event reported");
        Ok(())
    }

    async fn post<T: Serialize>(&self, path: &str, payload: &T) -> Result<(), ReporterError> {
        let url = self.url(path);
        let body = serde_json::to_string(payload)?;

        let mut headers = self.auth_headers()?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        debug!(url = %url, "Sending report");

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let body = classify(response).await?;
        if !body.trim().is_empty() {
            serde_json::from_str::<serde_json::Value>(&body)
                .map_err(|e| ReporterError::MalformedResponse(e.to_string()))?;
        }
        Ok(())
    }

    fn auth_headers(&self) -> Result<HeaderMap, ReporterError> {
        let mut headers = HeaderMap::new();
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.api_key))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Splits a response into success (with its body) and the error variants.
async fn classify(response: Response) -> Result<String, ReporterError> {
    let status = response.status();
    match status {
        _ if status.is_success() => Ok(response.text().await?),
        StatusCode::UNAUTHORIZED => {
            warn!("Collector rejected API key");
            Err(ReporterError::Unauthorized)
        }
        _ => {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), message = %message, "Collector returned error");
            Err(ReporterError::ServerError {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slashes_are_stripped() {
        let reporter = Reporter::new("https://collector.example.com//", "key").unwrap();
        assert_eq!(reporter.base_url(), "https://collector.example.com");
        assert_eq!(
            reporter.url(SLAIN_PATH),
            "https://collector.example.com/api/slain"
        );
    }

    #[test]
    fn outcome_mapping() {
        let ok: Result<(), ReporterError> = Ok(());
        assert_eq!(ReportOutcome::from_result(&ok), ReportOutcome::Connected);

        let unauthorized: Result<(), ReporterError> = Err(ReporterError::Unauthorized);
        assert_eq!(
            ReportOutcome::from_result(&unauthorized),
            ReportOutcome::InvalidKey
        );

        let server: Result<(), ReporterError> = Err(ReporterError::ServerError {
            status: 500,
            message: String::new(),
        });
        assert_eq!(ReportOutcome::from_result(&server), ReportOutcome::Error);

        let malformed: Result<(), ReporterError> =
            Err(ReporterError::MalformedResponse("eof".to_string()));
        assert_eq!(ReportOutcome::from_result(&malformed), ReportOutcome::Error);
    }

    #[test]
    fn outcome_states() {
        assert_eq!(ReportOutcome::Connected.state(), ConnectionState::Connected);
        assert_eq!(ReportOutcome::InvalidKey.state(), ConnectionState::InvalidKey);
        assert_eq!(ReportOutcome::Error.state(), ConnectionState::Error);
        assert_eq!(ReportOutcome::InvalidKey.to_string(), "invalid_key");
    }

    #[test]
    fn api_key_with_newline_is_rejected() {
        let reporter = Reporter::new("http://localhost", "bad\nkey").unwrap();
        assert!(matches!(
            reporter.auth_headers(),
            Err(ReporterError::InvalidHeader(_))
        ));
    }

    #[test]
    fn error_display() {
        let err = ReporterError::ServerError {
            status: 503,
            message: "maintenance".to_string(),
        };
        assert_eq!(err.to_string(), "server error: 503 - maintenance");
        assert_eq!(
            ReporterError::Unauthorized.to_string(),
            "authentication failed: invalid API key"
        );
    }
}
