//! Resolution observers: the diagnostics sink consumed by external
//! tooling.
//!
//! The container emits one record per resolution (key, lifetime applied,
//! duration). Sinks are registered on the [`ServiceCollection`] before
//! build and shared by the root provider and every scope.
//!
//! [`ServiceCollection`]: crate::ServiceCollection

use std::sync::Arc;
use std::time::Duration;

use crate::key::Key;
use crate::lifetime::Lifetime;

/// Sink for structured resolution records.
///
/// Implementations must be cheap: the hooks run inline on the resolving
/// thread.
pub trait ResolutionObserver: Send + Sync {
    /// A resolution of `key` is about to run.
    fn resolving(&self, key: &Key);

    /// A resolution of `key` finished. `succeeded` is false when the
    /// resolution returned an error.
    fn resolved(&self, key: &Key, lifetime: Lifetime, elapsed: Duration, succeeded: bool);
}

/// Observer that forwards records to [`tracing`] at debug level.
#[derive(Default)]
pub struct TracingObserver;

impl ResolutionObserver for TracingObserver {
    fn resolving(&self, key: &Key) {
        tracing::trace!(service = %key, "resolving");
    }

    fn resolved(&self, key: &Key, lifetime: Lifetime, elapsed: Duration, succeeded: bool) {
        tracing::debug!(
            service = %key,
            lifetime = lifetime.label(),
            elapsed_us = elapsed.as_micros() as u64,
            succeeded,
            "resolved"
        );
    }
}

/// Fan-out over the registered observers. Empty in the common case, and
/// the hot path checks that cheaply before taking any timestamps.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    sinks: Vec<Arc<dyn ResolutionObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, sink: Arc<dyn ResolutionObserver>) {
        self.sinks.push(sink);
    }

    pub(crate) fn merge(&mut self, other: Observers) {
        self.sinks.extend(other.sinks);
    }

    #[inline(always)]
    pub(crate) fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub(crate) fn resolving(&self, key: &Key) {
        for sink in &self.sinks {
            sink.resolving(key);
        }
    }

    pub(crate) fn resolved(
        &self,
        key: &Key,
        lifetime: Lifetime,
        elapsed: Duration,
        succeeded: bool,
    ) {
        for sink in &self.sinks {
            sink.resolved(key, lifetime, elapsed, succeeded);
        }
    }
}
