//! Error types for the Slaintrack Monitor.
//!
//! This module defines the crate-level error type. Every failure the monitor
//! can hit degrades to a [`ConnectionState`] via
//! [`MonitorError::connection_state`]; none of them terminate the process.

use thiserror::Error;

use crate::config::ConfigError;
use crate::reporter::ReporterError;
use crate::status::ConnectionState;
use crate::tailer::TailerError;

/// Errors that can occur during monitor operations.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Required settings are empty.
    #[error("missing required settings: {}", .0.join(", "))]
    MissingConfig(Vec<&'static str>),

    /// The log file is absent or unreadable.
    #[error("log error: {0}")]
    Tailer(#[from] TailerError),

    /// The collector failed the health preflight.
    #[error("collector unreachable: {0}")]
    ServerOffline(#[source] ReporterError),

    /// Any other collector failure.
    #[error("collector error: {0}")]
    Reporter(#[from] ReporterError),
}

impl MonitorError {
    /// The connection state this error surfaces as.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        match self {
            Self::Config(_) | Self::MissingConfig(_) => ConnectionState::MissingConfig,
            Self::Tailer(TailerError::FileNotFound { .. }) => ConnectionState::FileNotFound,
            Self::Tailer(TailerError::Io(_)) => ConnectionState::Error,
            Self::ServerOffline(_) => ConnectionState::ServerOffline,
            Self::Reporter(ReporterError::Unauthorized) => ConnectionState::InvalidKey,
            Self::Reporter(_) => ConnectionState::Error,
        }
    }
}

/// A specialized `Result` type for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn missing_config_display() {
        let err = MonitorError::MissingConfig(vec!["server_url", "api_key"]);
        assert_eq!(
            err.to_string(),
            "missing required settings: server_url, api_key"
        );
        assert_eq!(err.connection_state(), ConnectionState::MissingConfig);
    }

    #[test]
    fn file_not_found_maps_to_state() {
        let err: MonitorError = TailerError::FileNotFound {
            path: PathBuf::from("/nope.txt"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        }
        .into();
        assert_eq!(err.connection_state(), ConnectionState::FileNotFound);
        assert!(err.to_string().contains("/nope.txt"));
    }

    #[test]
    fn transient_io_maps_to_error() {
        let err: MonitorError =
            TailerError::Io(std::io::Error::new(std::io::ErrorKind::Other, "busy")).into();
        assert_eq!(err.connection_state(), ConnectionState::Error);
    }

    #[test]
    fn reporter_errors_map_to_states() {
        let err: MonitorError = ReporterError::Unauthorized.into();
        assert_eq!(err.connection_state(), ConnectionState::InvalidKey);

        let err: MonitorError = ReporterError::ServerError {
            status: 500,
            message: String::new(),
        }
        .into();
        assert_eq!(err.connection_state(), ConnectionState::Error);

        let err = MonitorError::ServerOffline(ReporterError::Timeout(
            std::time::Duration::from_secs(8),
        ));
        assert_eq!(err.connection_state(), ConnectionState::ServerOffline);
    }

    #[test]
    fn error_source_chain() {
        use std::error::Error;

        let err: MonitorError = TailerError::FileNotFound {
            path: PathBuf::from("/nope.txt"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        }
        .into();

        assert!(err.source().is_some());
    }
}
