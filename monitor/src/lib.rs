//! Slaintrack Monitor - game log tailer and kill reporter.
//!
//! This crate watches a continuously appended game log, extracts kill and
//! scheduled-event records from new lines, suppresses duplicate kill reports,
//! and forwards confirmed events to a collector over HTTP.
//!
//! # Overview
//!
//! ```text
//! Tailer ──► parser ──► Correlator ──► Reporter ──► ConnectionStateMachine
//! ```
//!
//! The [`session::Tracker`] ties the pieces together and is the only type a
//! presentation layer needs: start and stop watching, subscribe to the
//! connection status, and optionally to the debug feed.
//!
//! # Modules
//!
//! - [`types`]: Kill and scheduled-event records and collector payloads
//! - [`parser`]: Log line grammars
//! - [`correlator`]: PVP / non-PVP duplicate suppression
//! - [`reporter`]: Collector HTTP client
//! - [`tailer`]: Incremental log file reader
//! - [`status`]: Connection state machine and debug feed
//! - [`session`]: Watch session orchestration
//! - [`config`]: Configuration from environment variables
//! - [`error`]: Error types for monitor operations
//! - [`utils`]: Shared utilities (deferred values)

pub mod config;
pub mod correlator;
pub mod error;
pub mod parser;
pub mod reporter;
pub mod session;
pub mod status;
pub mod tailer;
pub mod types;
pub mod utils;

pub use config::{Config, ConfigError};
pub use correlator::{Correlator, Decision};
pub use error::{MonitorError, Result};
pub use parser::{parse_kill_line, parse_line, parse_scheduled_event_line, ParsedLine};
pub use reporter::{ReportOutcome, Reporter, ReporterError};
pub use session::Tracker;
pub use status::{ConnectionState, ConnectionStateMachine, DebugLog, DebugMessage, Severity};
pub use tailer::{Tailer, TailerError};
pub use types::{CorrelationKey, KillEvent, ScheduledEventAnnouncement};
pub use utils::DeferredQueue;
