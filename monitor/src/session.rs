//! Watch session orchestration.
//!
//! The [`Tracker`] is the entry point for the presentation layer. It owns at
//! most one watch session at a time:
//!
//! ```text
//! start_watching ──► missing_config? ──► open log ──► health ──► API key ──► connected
//!                         │                 │            │           │
//!                   missing_config    file_not_found  server_offline  invalid_key / error
//! ```
//!
//! Once connected, a spawned polling task owns the [`Tailer`], [`Correlator`]
//! and [`Reporter`]. Each tick reads the appended lines, reports scheduled
//! events directly, and passes kills through the correlator. Buffered kills
//! are reported when their window elapses. The tick body runs to completion,
//! reports included, before the loop looks at the next tick or deadline.
//!
//! # Example
//!
//! ```no_run
//! use slaintrack_monitor::config::Config;
//! use slaintrack_monitor::session::Tracker;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut tracker = Tracker::new();
//!     let config = Config::new("https://collector.example.com", "secret", "/games/eq/Logs/eqlog.txt");
//!
//!     let state = tracker.start_watching(config).await;
//!     println!("status: {state}");
//!
//!     tracker.stop_watching().await;
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::correlator::{Correlator, Decision};
use crate::error::{MonitorError, Result};
use crate::parser::{parse_line, ParsedLine};
use crate::reporter::{ReportOutcome, Reporter, ReporterError};
use crate::status::{ConnectionState, ConnectionStateMachine, DebugLog};
use crate::tailer::Tailer;
use crate::types::{KillEvent, ScheduledEventAnnouncement};

/// A running watch session.
#[derive(Debug)]
struct ActiveSession {
    path: PathBuf,
    handle: JoinHandle<()>,
}

/// Owns the watch session and the status feeds shown to the user.
#[derive(Debug)]
pub struct Tracker {
    status: ConnectionStateMachine,
    debug_log: DebugLog,
    session: Option<ActiveSession>,
}

impl Tracker {
    /// Creates an idle tracker in the `stopped` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: ConnectionStateMachine::new(),
            debug_log: DebugLog::new(),
            session: None,
        }
    }

    /// The connection status feed.
    #[must_use]
    pub fn status(&self) -> &ConnectionStateMachine {
        &self.status
    }

    /// The advisory debug message feed.
    #[must_use]
    pub fn debug_log(&self) -> &DebugLog {
        &self.debug_log
    }

    /// Returns true while a polling task is running.
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.session.is_some()
    }

    /// The log file being watched, if any.
    #[must_use]
    pub fn watched_path(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.path.as_path())
    }

    /// Starts watching the configured log file.
    ///
    /// Any previous session is torn down first. Returns the state the start
    /// attempt ended in; only `connected` leaves a polling task running.
    pub async fn start_watching(&mut self, config: Config) -> ConnectionState {
        self.teardown().await;
        self.status.begin_start();

        match preflight(&config).await {
            Ok((tailer, reporter)) => {
                let path = tailer.path().to_path_buf();
                self.status.signal(ConnectionState::Connected);
                self.debug_log
                    .success(format!("Watching {}", path.display()));

                let task = PollingTask {
                    tailer,
                    reporter,
                    correlator: Correlator::new(config.correlation_window),
                    status: self.status.clone(),
                    debug_log: self.debug_log.clone(),
                };
                let handle = tokio::spawn(task.run(config.poll_interval));

                self.session = Some(ActiveSession { path, handle });
                ConnectionState::Connected
            }
            Err(e) => {
                let state = e.connection_state();
                warn!(error = %e, state = %state, "Failed to start watching");
                self.debug_log.error(e.to_string());
                self.status.signal(state);
                state
            }
        }
    }

    /// Stops watching and discards every buffered kill. Idempotent.
    pub async fn stop_watching(&mut self) {
        self.teardown().await;
        self.status.stop();
    }

    /// Cancels the polling task and waits for it to be dropped.
    async fn teardown(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        session.handle.abort();
        // Resolves once the task (and its pending kills) has been dropped.
        let _ = session.handle.await;

        info!(path = %session.path.display(), "Stopped watching");
        self.debug_log.info("Stopped watching");
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.handle.abort();
        }
    }
}

/// Runs the start checks in order and returns the session's tailer and
/// reporter.
async fn preflight(config: &Config) -> Result<(Tailer, Reporter)> {
    let missing = config.missing_fields();
    if !missing.is_empty() {
        return Err(MonitorError::MissingConfig(missing));
    }

    let tailer = Tailer::open(&config.log_path)?;

    let reporter = Reporter::new(config.base_url(), &config.api_key)?
        .with_event_timezone(config.event_timezone.clone());

    reporter
        .check_health()
        .await
        .map_err(MonitorError::ServerOffline)?;
    reporter.check_api_key().await?;

    Ok((tailer, reporter))
}

/// State owned by the spawned polling loop.
struct PollingTask {
    tailer: Tailer,
    reporter: Reporter,
    correlator: Correlator,
    status: ConnectionStateMachine,
    debug_log: DebugLog,
}

impl PollingTask {
    async fn run(mut self, poll_interval: Duration) {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(
            poll_ms = poll_interval.as_millis(),
            window_ms = self.correlator.window().as_millis(),
            "Starting polling loop"
        );

        loop {
            let deadline = self.correlator.next_deadline();

            tokio::select! {
                _ = ticker.tick() => {
                    self.process_tick().await;
                }
                _ = wait_for(deadline) => {
                    self.report_due().await;
                }
            }
        }
    }

    async fn process_tick(&mut self) {
        let lines = match self.tailer.poll_async().await {
            Ok(lines) => lines,
            Err(e) => {
                warn!(path = %self.tailer.path().display(), error = %e, "Failed to read log");
                self.debug_log.error(format!("Failed to read log: {e}"));
                self.status.signal(ConnectionState::Error);
                return;
            }
        };

        if !lines.is_empty() {
            debug!(line_count = lines.len(), "Processing new lines");
        }

        for line in lines {
            self.process_line(&line).await;
        }
    }

    async fn process_line(&mut self, line: &str) {
        match parse_line(line) {
            Some(ParsedLine::ScheduledEvent(announcement)) => {
                self.debug_log
                    .parse(describe_scheduled_event(&announcement));
                let result = self.reporter.report_scheduled_event(line).await;
                self.record_outcome("scheduled event", &result);
            }
            Some(ParsedLine::Kill(event)) => {
                self.debug_log.parse(describe_kill(&event));
                match self.correlator.submit(event, Instant::now()) {
                    Decision::ReportNow { event, superseded } => {
                        if superseded {
                            self.debug_log.info(format!(
                                "PVP report replaces pending kill of {}",
                                event.npc_name
                            ));
                        }
                        self.report_kill(&event).await;
                    }
                    Decision::Buffered { replaced } => {
                        trace!(replaced, "Kill buffered");
                    }
                }
            }
            None => trace!(line = %line, "Unmatched line"),
        }
    }

    async fn report_due(&mut self) {
        for event in self.correlator.take_due(Instant::now()) {
            self.report_kill(&event).await;
        }
    }

    async fn report_kill(&mut self, event: &KillEvent) {
        let result = self.reporter.report_kill(event).await;
        self.record_outcome(&format!("kill of {}", event.npc_name), &result);
    }

    fn record_outcome(&self, what: &str, result: &std::result::Result<(), ReporterError>) {
        match result {
            Ok(()) => self.debug_log.success(format!("Reported {what}")),
            Err(e) => {
                warn!(what, error = %e, "Report failed");
                self.debug_log.error(format!("Failed to report {what}: {e}"));
            }
        }
        self.status.signal(ReportOutcome::from_result(result).state());
    }
}

/// Sleeps until `deadline`, or forever when there is none.
async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

fn describe_scheduled_event(announcement: &ScheduledEventAnnouncement) -> String {
    format!(
        "Scheduled event in {}d {}h {}m {}s ({}s)",
        announcement.days,
        announcement.hours,
        announcement.minutes,
        announcement.seconds,
        announcement.total_seconds()
    )
}

fn describe_kill(event: &KillEvent) -> String {
    let mut text = format!("Kill: {}", event.npc_name);
    if let Some(player) = &event.player_name {
        text.push_str(&format!(" by {player}"));
    }
    if let Some(guild) = &event.guild_name {
        text.push_str(&format!(" <{guild}>"));
    }
    if let Some(zone) = &event.zone {
        text.push_str(&format!(" in {zone}"));
    }
    if event.is_pvp {
        text.push_str(" [PVP]");
    }
    text
}
