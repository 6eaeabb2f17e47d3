//! Keyed, cancellable deferred values.
//!
//! A [`DeferredQueue`] holds at most one pending value per key, each with a
//! deadline. The owner drives it from its event loop:
//!
//! 1. [`schedule`](DeferredQueue::schedule) installs a value, replacing and
//!    returning any value already pending for that key (the deadline restarts)
//! 2. [`cancel`](DeferredQueue::cancel) removes a pending value immediately
//! 3. [`next_deadline`](DeferredQueue::next_deadline) tells the loop how long
//!    it may sleep
//! 4. [`take_expired`](DeferredQueue::take_expired) hands out every value
//!    whose deadline has passed, exactly once
//!
//! Nothing runs in the background, so cancelling is synchronous and a value
//! that has been taken can never fire again.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use tokio::time::Instant;
//! use slaintrack_monitor::utils::deferred::DeferredQueue;
//!
//! let mut queue = DeferredQueue::new(Duration::from_millis(100));
//! let start = Instant::now();
//!
//! queue.schedule("key", 1, start);
//! queue.schedule("key", 2, start);
//!
//! assert!(queue.take_expired(start).is_empty());
//! let fired = queue.take_expired(start + Duration::from_millis(100));
//! assert_eq!(fired, vec![("key", 2)]);
//! ```

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

/// A value waiting for its deadline.
#[derive(Debug)]
struct Deferred<V> {
    value: V,
    deadline: Instant,
}

/// Pending values keyed by `K`, each released once its delay has elapsed.
#[derive(Debug)]
pub struct DeferredQueue<K, V> {
    delay: Duration,
    pending: HashMap<K, Deferred<V>>,
}

impl<K, V> DeferredQueue<K, V>
where
    K: Clone + Eq + Hash + Debug,
{
    /// Creates an empty queue releasing values `delay` after they are scheduled.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: HashMap::new(),
        }
    }

    /// Returns the delay applied to newly scheduled values.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedules `value` under `key`, due at `now + delay`.
    ///
    /// Returns the value it replaced, if one was pending for the same key.
    pub fn schedule(&mut self, key: K, value: V, now: Instant) -> Option<V> {
        let deadline = now + self.delay;
        trace!(key = ?key, "Scheduling deferred value");
        self.pending
            .insert(key, Deferred { value, deadline })
            .map(|previous| previous.value)
    }

    /// Cancels the value pending under `key`.
    ///
    /// Cancelling an absent or already released key is a no-op returning `None`.
    pub fn cancel(&mut self, key: &K) -> Option<V> {
        let cancelled = self.pending.remove(key).map(|d| d.value);
        if cancelled.is_some() {
            trace!(key = ?key, "Cancelled deferred value");
        }
        cancelled
    }

    /// Returns whether a value is pending under `key`.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Returns the earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|d| d.deadline).min()
    }

    /// Removes and returns every value whose deadline is at or before `now`,
    /// earliest deadline first.
    pub fn take_expired(&mut self, now: Instant) -> Vec<(K, V)> {
        let expired_keys: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, d)| d.deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();

        let mut expired: Vec<(Instant, K, V)> = expired_keys
            .into_iter()
            .filter_map(|key| {
                self.pending
                    .remove(&key)
                    .map(|d| (d.deadline, key, d.value))
            })
            .collect();
        expired.sort_by_key(|(deadline, _, _)| *deadline);

        expired
            .into_iter()
            .map(|(_, key, value)| (key, value))
            .collect()
    }

    /// Drops every pending value without releasing it.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Number of pending values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
