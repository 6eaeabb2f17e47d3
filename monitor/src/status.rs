//! Connection status and debug feeds for the presentation layer.
//!
//! Two push-style feeds are exposed:
//!
//! - [`ConnectionStateMachine`] holds the current [`ConnectionState`]. It is
//!   backed by a `tokio::sync::watch` channel, so the current state can be read
//!   at any time and listeners are woken on every change.
//! - [`DebugLog`] is an advisory `tokio::sync::broadcast` feed of free-text
//!   messages. It never affects control flow.
//!
//! # Example
//!
//! ```
//! use slaintrack_monitor::status::{ConnectionState, ConnectionStateMachine};
//!
//! let machine = ConnectionStateMachine::new();
//! let rx = machine.subscribe();
//!
//! machine.begin_start();
//! machine.signal(ConnectionState::Connected);
//!
//! assert_eq!(*rx.borrow(), ConnectionState::Connected);
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

/// Capacity of the debug message feed. Slow listeners lag rather than block.
pub const DEBUG_CHANNEL_CAPACITY: usize = 256;

/// Health of the log-to-collector pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Stopped,
    Starting,
    Connected,
    MissingConfig,
    FileNotFound,
    ServerOffline,
    InvalidKey,
    Error,
    /// Transient acknowledgement shown after settings are saved.
    Saved,
}

impl ConnectionState {
    /// Returns the wire name of the state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Connected => "connected",
            Self::MissingConfig => "missing_config",
            Self::FileNotFound => "file_not_found",
            Self::ServerOffline => "server_offline",
            Self::InvalidKey => "invalid_key",
            Self::Error => "error",
            Self::Saved => "saved",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reactive holder of the current [`ConnectionState`].
///
/// Transitions come only from the tracker's preflight steps, polling errors,
/// and report outcomes. While the machine is `stopped`, outcome signals are
/// ignored: only [`begin_start`](Self::begin_start) leaves that state.
///
/// Cloning yields another handle onto the same state.
#[derive(Debug, Clone)]
pub struct ConnectionStateMachine {
    tx: watch::Sender<ConnectionState>,
}

impl ConnectionStateMachine {
    /// Creates a machine in the `stopped` state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionState::Stopped);
        Self { tx }
    }

    /// Returns the current state.
    #[must_use]
    pub fn current(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    /// Registers a status listener.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }

    /// Enters `starting`. Allowed from any state.
    pub fn begin_start(&self) {
        self.set(ConnectionState::Starting);
    }

    /// Applies an outcome signal.
    ///
    /// Returns `false` when the signal was dropped because the machine is
    /// stopped.
    pub fn signal(&self, state: ConnectionState) -> bool {
        if self.current() == ConnectionState::Stopped {
            debug!(state = %state, "Ignoring status signal while stopped");
            return false;
        }
        self.set(state);
        true
    }

    /// Enters `stopped`.
    pub fn stop(&self) {
        self.set(ConnectionState::Stopped);
    }

    /// Shows the transient `saved` acknowledgement.
    pub fn mark_saved(&self) {
        self.set(ConnectionState::Saved);
    }

    fn set(&self, state: ConnectionState) {
        self.tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            info!(from = %current, to = %state, "Connection state changed");
            *current = state;
            true
        });
    }
}

impl Default for ConnectionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// Severity tag of a [`DebugMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Error,
    Parse,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
            Self::Parse => "parse",
        })
    }
}

/// One advisory message for the debug console.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugMessage {
    pub message: String,
    pub severity: Severity,
    pub at: DateTime<Utc>,
}

/// Broadcast feed of [`DebugMessage`]s.
///
/// Every message is mirrored to `tracing` at `debug` level. Publishing with no listeners is a
/// no-op.
#[derive(Debug, Clone)]
pub struct DebugLog {
    tx: broadcast::Sender<DebugMessage>,
}

impl DebugLog {
    /// Creates a feed with [`DEBUG_CHANNEL_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(DEBUG_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Registers a debug listener.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DebugMessage> {
        self.tx.subscribe()
    }

    /// Publishes a message.
    ///
    /// The mirror is logged at `debug` level. Callers log failures themselves
    /// with structured fields.
    pub fn publish(&self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        debug!(severity = %severity, message = %message, "Debug feed message");

        // No receivers is fine.
        let _ = self.tx.send(DebugMessage {
            message,
            severity,
            at: Utc::now(),
        });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.publish(Severity::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(Severity::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(Severity::Error, message);
    }

    pub fn parse(&self, message: impl Into<String>) {
        self.publish(Severity::Parse, message);
    }
}

impl Default for DebugLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_serializes_to_snake_case() {
        assert_eq!(
            serde_json::to_string(&ConnectionState::MissingConfig).unwrap(),
            "\"missing_config\""
        );
        assert_eq!(
            serde_json::to_string(&ConnectionState::FileNotFound).unwrap(),
            "\"file_not_found\""
        );
        assert_eq!(ConnectionState::ServerOffline.to_string(), "server_offline");
        assert_eq!(ConnectionState::InvalidKey.to_string(), "invalid_key");
    }

    #[test]
    fn machine_starts_stopped() {
        let machine = ConnectionStateMachine::new();
        assert_eq!(machine.current(), ConnectionState::Stopped);
    }

    #[test]
    fn signals_ignored_while_stopped() {
        let machine = ConnectionStateMachine::new();

        assert!(!machine.signal(ConnectionState::Connected));
        assert_eq!(machine.current(), ConnectionState::Stopped);

        machine.begin_start();
        assert!(machine.signal(ConnectionState::Connected));
        assert_eq!(machine.current(), ConnectionState::Connected);
    }

    #[test]
    fn connected_leaves_only_on_signal_or_stop() {
        let machine = ConnectionStateMachine::new();
        machine.begin_start();
        machine.signal(ConnectionState::Connected);

        machine.signal(ConnectionState::InvalidKey);
        assert_eq!(machine.current(), ConnectionState::InvalidKey);

        machine.stop();
        assert_eq!(machine.current(), ConnectionState::Stopped);
    }

    #[tokio::test]
    async fn listeners_see_changes() {
        let machine = ConnectionStateMachine::new();
        let mut rx = machine.subscribe();

        machine.begin_start();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), ConnectionState::Starting);

        machine.signal(ConnectionState::Error);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), ConnectionState::Error);
    }

    #[test]
    fn repeated_state_does_not_notify() {
        let machine = ConnectionStateMachine::new();
        let mut rx = machine.subscribe();
        machine.begin_start();
        rx.borrow_and_update();

        machine.begin_start();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn mark_saved_is_visible() {
        let machine = ConnectionStateMachine::new();
        machine.mark_saved();
        assert_eq!(machine.current(), ConnectionState::Saved);
    }

    #[tokio::test]
    async fn debug_log_delivers_messages() {
        let log = DebugLog::new();
        let mut rx = log.subscribe();

        log.parse("Kill: Grimrod");
        log.error("Report failed");

        let first = rx.recv().await.unwrap();
        assert_eq!(first.severity, Severity::Parse);
        assert_eq!(first.message, "Kill: Grimrod");

        let second = rx.recv().await.unwrap();
        assert_eq!(second.severity, Severity::Error);
    }

    #[test]
    fn debug_log_mirror_stays_at_debug_level() {
        use std::sync::{Arc, Mutex};
        use tracing::{Event, Level, Subscriber};
        use tracing_subscriber::layer::{Context, SubscriberExt};
        use tracing_subscriber::Layer;

        struct LevelRecorder(Arc<Mutex<Vec<Level>>>);

        impl<S: Subscriber> Layer<S> for LevelRecorder {
            fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
                self.0.lock().unwrap().push(*event.metadata().level());
            }
        }

        let levels = Arc::new(Mutex::new(Vec::new()));
        let subscriber =
            tracing_subscriber::registry().with(LevelRecorder(Arc::clone(&levels)));

        tracing::subscriber::with_default(subscriber, || {
            let log = DebugLog::new();
            log.error("Failed to report kill of Grimrod");
            log.success("Reported kill of Grimrod");
            log.parse("Kill: Grimrod");
        });

        assert_eq!(*levels.lock().unwrap(), vec![Level::DEBUG; 3]);
    }

    #[test]
    fn debug_log_without_listeners_is_noop() {
        let log = DebugLog::new();
        log.info("nobody is listening");
    }
}
