//! Diagnostic observers for resolution events.
//!
//! Observers see every resolution that reaches a storager: when it starts,
//! when it finishes and when it fails. They are registered on the
//! `ServiceCollection` and shared by the provider and all its scopes.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::error::DiError;
use crate::key::Key;

/// Hooks for observing resolution.
///
/// Calls are made synchronously on the resolving thread, so keep
/// implementations cheap.
///
/// # Examples
///
/// ```
/// use proxy_di::{DiError, DiObserver, Key, ServiceCollection};
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Recorder {
///     seen: Mutex<Vec<String>>,
/// }
///
/// impl DiObserver for Recorder {
///     fn resolving(&self, key: &Key) {
///         self.seen.lock().unwrap().push(key.to_string());
///     }
///
///     fn resolved(&self, _key: &Key, _duration: Duration) {}
/// }
///
/// let recorder = Arc::new(Recorder::default());
/// let mut services = ServiceCollection::new();
/// services.add_singleton(7u8);
/// services.add_observer(recorder.clone());
///
/// let provider = services.build();
/// let _ = proxy_di::Resolver::resolve::<u8>(&provider);
/// assert_eq!(recorder.seen.lock().unwrap().as_slice(), ["u8"]);
/// ```
pub trait DiObserver: Send + Sync {
    /// A build is starting for `key`.
    ///
    /// Instances already cached by their storager are handed out without
    /// notifying observers.
    fn resolving(&self, key: &Key);

    /// Resolution of `key` produced an instance.
    fn resolved(&self, key: &Key, duration: Duration);

    /// Resolution of `key` failed. Defaults to doing nothing.
    fn resolution_failed(&self, key: &Key, error: &DiError) {
        let _ = (key, error);
    }
}

/// Registered observers.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn DiObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn DiObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    #[inline]
    pub(crate) fn resolving(&self, key: &Key) {
        for observer in &self.observers {
            observer.resolving(key);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, key: &Key, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(key, duration);
        }
    }

    #[inline]
    pub(crate) fn resolution_failed(&self, key: &Key, error: &DiError) {
        for observer in &self.observers {
            observer.resolution_failed(key, error);
        }
    }
}

/// Observer that forwards resolution events to `tracing`.
///
/// Starts and successes are emitted at `trace`/`debug` level, failures at
/// `warn`, all under the given target label.
///
/// # Examples
///
/// ```
/// use proxy_di::{LoggingObserver, ServiceCollection};
/// use std::sync::Arc;
///
/// let mut services = ServiceCollection::new();
/// services.add_observer(Arc::new(LoggingObserver::with_label("checkout")));
/// let provider = services.build();
/// ```
pub struct LoggingObserver {
    label: String,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self::with_label("proxy-di")
    }

    /// Observer whose events carry `label` as the `container` field.
    pub fn with_label(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl DiObserver for LoggingObserver {
    fn resolving(&self, key: &Key) {
        trace!(target: "proxy_di", container = %self.label, service = %key, "resolving");
    }

    fn resolved(&self, key: &Key, duration: Duration) {
        debug!(
            target: "proxy_di",
            container = %self.label,
            service = %key,
            elapsed_us = duration.as_micros() as u64,
            "resolved"
        );
    }

    fn resolution_failed(&self, key: &Key, error: &DiError) {
        warn!(target: "proxy_di", container = %self.label, service = %key, %error, "resolution failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Counting {
        events: Mutex<Vec<&'static str>>,
    }

    impl DiObserver for Counting {
        fn resolving(&self, _: &Key) {
            self.events.lock().push("resolving");
        }

        fn resolved(&self, _: &Key, _: Duration) {
            self.events.lock().push("resolved");
        }

        fn resolution_failed(&self, _: &Key, _: &DiError) {
            self.events.lock().push("failed");
        }
    }

    #[test]
    fn observers_fan_out_in_order() {
        let a = Arc::new(Counting::default());
        let b = Arc::new(Counting::default());
        let mut observers = Observers::new();
        assert!(!observers.has_observers());
        observers.add(a.clone());
        observers.add(b.clone());

        let key = Key::of::<u8>();
        observers.resolving(&key);
        observers.resolved(&key, Duration::from_micros(5));
        observers.resolution_failed(&key, &DiError::factory("x"));

        assert_eq!(*a.events.lock(), vec!["resolving", "resolved", "failed"]);
        assert_eq!(*b.events.lock(), vec!["resolving", "resolved", "failed"]);
    }

    #[test]
    fn logging_observer_accepts_events_without_subscriber() {
        let observer = LoggingObserver::default();
        let key = Key::named::<String>("db");
        observer.resolving(&key);
        observer.resolved(&key, Duration::from_millis(1));
        observer.resolution_failed(&key, &DiError::Unresolved(key.to_string()));
    }
}
