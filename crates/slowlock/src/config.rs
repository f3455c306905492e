//! Per-lock configuration and process-wide defaults.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use crate::record::{ReportSink, log_report};
use crate::{AsyncMutex, AsyncRwLock, Mutex, RwLock};

// ── Process-wide defaults ────────────────────────────────────

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

static DEFAULT_TIMEOUT_NANOS: AtomicU64 = AtomicU64::new(DEFAULT_TIMEOUT.as_nanos() as u64);

static DEFAULT_SINK: LazyLock<parking_lot::RwLock<ReportSink>> =
    LazyLock::new(|| parking_lot::RwLock::new(Arc::new(log_report)));

/// Set the process-wide threshold after which a waiting acquisition is
/// considered slow. Intended to be called once during startup, before any
/// tracked lock sees contention; reads are not synchronized against
/// concurrent writers.
///
/// # Panics
///
/// Panics if `timeout` is zero. A zero default would make every blocked
/// acquisition report in a tight loop, so it is rejected up front.
pub fn set_default_timeout(timeout: Duration) {
    assert!(
        !timeout.is_zero(),
        "default slow-lock timeout must be non-zero"
    );
    let nanos = timeout.as_nanos().min(u64::MAX as u128) as u64;
    DEFAULT_TIMEOUT_NANOS.store(nanos, Ordering::Relaxed);
}

/// Set the process-wide report sink used by locks whose configuration does
/// not carry one. Intended to be called once during startup.
pub fn set_default_report_sink(sink: ReportSink) {
    *DEFAULT_SINK.write() = sink;
}

pub(crate) fn default_timeout() -> Duration {
    Duration::from_nanos(DEFAULT_TIMEOUT_NANOS.load(Ordering::Relaxed))
}

pub(crate) fn default_report_sink() -> ReportSink {
    Arc::clone(&DEFAULT_SINK.read())
}

// ── Per-lock configuration ───────────────────────────────────

/// Configuration for individually tracked locks.
///
/// A `Config` is a plain value: clone it and reuse it to build any number
/// of lock instances, which share nothing with each other afterwards.
/// Unset fields fall back to the process-wide defaults *at acquisition
/// time*, not at construction time, so locks built before
/// [`set_default_timeout`] runs still pick up the configured default.
#[derive(Clone, Default)]
pub struct Config {
    pub(crate) annotation: Option<Arc<str>>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) report_sink: Option<ReportSink>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label carried by every report produced by locks built from this
    /// config.
    pub fn annotation(mut self, annotation: impl Into<Arc<str>>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    /// Per-lock slow threshold. `Duration::ZERO` means "use the process
    /// default", the same as never calling this.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// Per-lock report sink.
    pub fn report_sink(mut self, sink: ReportSink) -> Self {
        self.report_sink = Some(sink);
        self
    }

    /// Build a tracked exclusive lock around `value`.
    pub fn mutex<T>(&self, value: T) -> Mutex<T> {
        Mutex::with_config(self.clone(), value)
    }

    /// Build a tracked reader/writer lock around `value`.
    pub fn rw_lock<T>(&self, value: T) -> RwLock<T> {
        RwLock::with_config(self.clone(), value)
    }

    /// Build a tracked async exclusive lock around `value`.
    pub fn async_mutex<T>(&self, value: T) -> AsyncMutex<T> {
        AsyncMutex::with_config(self.clone(), value)
    }

    /// Build a tracked async reader/writer lock around `value`.
    pub fn async_rw_lock<T>(&self, value: T) -> AsyncRwLock<T> {
        AsyncRwLock::with_config(self.clone(), value)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("annotation", &self.annotation)
            .field("timeout", &self.timeout)
            .field("report_sink", &self.report_sink.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_means_unset() {
        let config = Config::new().timeout(Duration::ZERO);
        assert!(config.timeout.is_none());

        let config = Config::new().timeout(Duration::from_millis(50));
        assert_eq!(config.timeout, Some(Duration::from_millis(50)));
    }

    #[test]
    #[should_panic(expected = "must be non-zero")]
    fn zero_default_timeout_is_rejected() {
        set_default_timeout(Duration::ZERO);
    }

    #[test]
    fn config_is_reusable_across_locks() {
        let config = Config::new().annotation("shared");
        let a = config.mutex(1u32);
        let b = config.mutex(2u32);
        assert_eq!(*a.lock(), 1);
        assert_eq!(*b.lock(), 2);
    }
}
