//! Utility modules for the Slaintrack monitor.
//!
//! # Modules
//!
//! - [`deferred`]: Keyed cancellable deferred values, used by the correlator

pub mod deferred;

pub use deferred::DeferredQueue;
