//! Per-attempt wait records and the sink they are reported to.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

// ── Caller info ──────────────────────────────────────────────

/// Source location of the call that started a lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerInfo {
    file: &'static str,
    line: u32,
}

impl CallerInfo {
    /// Capture the call site of the nearest `#[track_caller]` frame.
    #[track_caller]
    pub(crate) fn capture() -> Self {
        let location = Location::caller();
        Self {
            file: location.file(),
            line: location.line(),
        }
    }

    pub fn file(&self) -> &'static str {
        self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }
}

impl fmt::Display for CallerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

// ── Wait record ──────────────────────────────────────────────

/// Immutable description of one blocking acquisition attempt: what lock it
/// is for (annotation), where it was made, and when it started waiting.
///
/// Created fresh for every tracked acquisition. A slow attempt's record is
/// handed to the report sink once per elapsed timeout interval; on success
/// the record becomes the lock's "last successful" acquisition.
#[derive(Debug, Clone)]
pub struct WaitRecord {
    annotation: Option<Arc<str>>,
    started: Instant,
    started_at: SystemTime,
    caller: CallerInfo,
}

impl WaitRecord {
    pub(crate) fn new(annotation: Option<Arc<str>>, caller: CallerInfo) -> Self {
        Self {
            annotation,
            started: Instant::now(),
            started_at: SystemTime::now(),
            caller,
        }
    }

    /// Label from the lock's configuration, if any.
    pub fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }

    /// Call site of the acquisition.
    pub fn caller(&self) -> CallerInfo {
        self.caller
    }

    /// Wall-clock time the attempt began waiting.
    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// Time spent waiting so far (total wait, once the attempt completed).
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl fmt::Display for WaitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(annotation) = self.annotation() {
            write!(f, "\"{annotation}\" ")?;
        }
        let start = self
            .started_at
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default();
        write!(
            f,
            "at {} waiting {:.3}s (since {}.{:03} unix)",
            self.caller,
            self.elapsed().as_secs_f64(),
            start.as_secs(),
            start.subsec_millis()
        )
    }
}

// ── Report sink ──────────────────────────────────────────────

/// Callback invoked when a slow acquisition is detected.
///
/// Receives the record of the attempt that is still waiting, plus the
/// record of the last acquisition that completed through the tracked path
/// on the same lock, if there has been one. Sinks may run concurrently
/// with the acquisition they report on; they must not panic.
pub type ReportSink = Arc<dyn Fn(&WaitRecord, Option<&WaitRecord>) + Send + Sync>;

/// Stock sink: one `tracing` warning per report.
pub(crate) fn log_report(record: &WaitRecord, last_successful: Option<&WaitRecord>) {
    match last_successful {
        Some(last) => tracing::warn!(
            target: "slowlock",
            "slow lock acquisition: {record}; last successful: {last}"
        ),
        None => tracing::warn!(target: "slowlock", "slow lock acquisition: {record}"),
    }
}
