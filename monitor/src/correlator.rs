//! Kill correlation for Slaintrack Monitor.
//!
//! The same kill is often announced twice: once with non-PVP phrasing and, if
//! it was really a PVP kill, again through the authoritative `[PVP]`
//! broadcast. The correlator holds non-PVP kills for a short window so a
//! following PVP broadcast for the same NPC can suppress them.
//!
//! # Policy
//!
//! For each kill, keyed by its [`CorrelationKey`]:
//!
//! - **PVP**: any pending kill for the key is discarded unreported and the PVP
//!   kill is reported immediately.
//! - **Non-PVP**: the kill replaces any pending kill for the key and waits out
//!   a fresh window. If nothing supersedes it, it is released for reporting
//!   by [`Correlator::take_due`].
//!
//! Kills for the same NPC name in different zones share a key.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::types::{CorrelationKey, KillEvent};
use crate::utils::deferred::DeferredQueue;

/// Default time a non-PVP kill waits for a superseding PVP broadcast.
pub const DEFAULT_CORRELATION_WINDOW_MS: u64 = 2000;

/// What to do with a kill submitted to the [`Correlator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Report this event now.
    ReportNow {
        event: KillEvent,
        /// Whether a pending non-PVP kill for the same key was discarded.
        superseded: bool,
    },

    /// The event is pending and will be released by [`Correlator::take_due`].
    Buffered {
        /// Whether an earlier pending kill for the same key was replaced.
        replaced: bool,
    },
}

/// Buffers ambiguous kills and decides which reports reach the collector.
#[derive(Debug)]
pub struct Correlator {
    pending: DeferredQueue<CorrelationKey, KillEvent>,
}

impl Correlator {
    /// Creates a correlator with the given buffering window.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            pending: DeferredQueue::new(window),
        }
    }

    /// Creates a correlator with the default 2 second window.
    #[must_use]
    pub fn with_default_window() -> Self {
        Self::new(Duration::from_millis(DEFAULT_CORRELATION_WINDOW_MS))
    }

    /// Returns the buffering window.
    #[must_use]
    pub fn window(&self) -> Duration {
        self.pending.delay()
    }

    /// Applies the correlation policy to a freshly parsed kill.
    pub fn submit(&mut self, event: KillEvent, now: Instant) -> Decision {
        let key = event.correlation_key();

        if event.is_pvp {
            let superseded = self.pending.cancel(&key).is_some();
            if superseded {
                debug!(key = %key, "PVP kill superseded pending report");
            }
            return Decision::ReportNow { event, superseded };
        }

        let replaced = self.pending.schedule(key.clone(), event, now).is_some();
        debug!(
            key = %key,
            replaced,
            window_ms = self.window().as_millis(),
            "Buffered non-PVP kill"
        );
        Decision::Buffered { replaced }
    }

    /// Earliest moment a buffered kill becomes due.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.next_deadline()
    }

    /// Releases every buffered kill whose window has elapsed.
    pub fn take_due(&mut self, now: Instant) -> Vec<KillEvent> {
        self.pending
            .take_expired(now)
            .into_iter()
            .map(|(_, event)| event)
            .collect()
    }

    /// Returns whether a kill is buffered for `key`.
    #[must_use]
    pub fn is_pending(&self, key: &CorrelationKey) -> bool {
        self.pending.contains(key)
    }

    /// Number of buffered kills.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Discards every buffered kill without reporting it.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl Default for Correlator {
    fn default() -> Self {
        Self::with_default_window()
    }
}
