//! Shared tracking logic composed into every tracked lock type.

use std::future::Future;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::config::{Config, default_report_sink, default_timeout};
use crate::record::{ReportSink, WaitRecord};

/// Per-lock-instance tracking state: the configuration the lock was built
/// from, plus the record of the last acquisition that completed through
/// the tracked path.
///
/// The last-successful record sits behind a plain `parking_lot::RwLock`.
/// It must never be one of the tracked types: tracking the tracker's own
/// bookkeeping would recurse without bound.
pub(crate) struct LockTracker {
    config: Config,
    last_success: Arc<parking_lot::RwLock<Option<Arc<WaitRecord>>>>,
}

impl LockTracker {
    pub(crate) fn new(config: Config) -> Self {
        Self {
            config,
            last_success: Arc::new(parking_lot::RwLock::new(None)),
        }
    }

    pub(crate) fn annotation(&self) -> Option<Arc<str>> {
        self.config.annotation.clone()
    }

    /// Record a completed acquisition as the most recent successful one.
    pub(crate) fn commit(&self, record: WaitRecord) {
        self.store(Arc::new(record));
    }

    #[cfg(test)]
    pub(crate) fn last_successful(&self) -> Option<Arc<WaitRecord>> {
        self.last_success.read().clone()
    }

    fn store(&self, record: Arc<WaitRecord>) {
        *self.last_success.write() = Some(record);
    }

    /// Timeout for this attempt: the config's if set, else the process
    /// default, resolved now rather than at lock construction.
    fn effective_timeout(&self) -> Duration {
        self.config.timeout.unwrap_or_else(default_timeout)
    }

    fn effective_sink(&self) -> ReportSink {
        self.config
            .report_sink
            .clone()
            .unwrap_or_else(default_report_sink)
    }

    /// Run `acquire` to completion while a monitor thread reports every
    /// effective-timeout interval that elapses without completion.
    ///
    /// The monitor is torn down structurally rather than via a polled
    /// flag: it blocks in `recv_timeout` on a channel whose sender lives
    /// in this frame, so returning from the acquisition (or unwinding out
    /// of it) disconnects the channel and stops the monitor. Tracking is
    /// observational only; it never changes whether or when the lock is
    /// acquired.
    pub(crate) fn track<G>(&self, record: WaitRecord, acquire: impl FnOnce() -> G) -> G {
        let timeout = self.effective_timeout();
        let record = Arc::new(record);
        let (done_tx, done_rx) = mpsc::channel::<()>();

        let monitor = Monitor {
            record: Arc::clone(&record),
            last_success: Arc::clone(&self.last_success),
            sink: self.effective_sink(),
        };
        let spawned = thread::Builder::new()
            .name("slowlock-monitor".into())
            .spawn(move || monitor.run(timeout, done_rx));
        if let Err(err) = spawned {
            tracing::warn!(
                target: "slowlock",
                "monitor thread failed to spawn, acquisition proceeds untracked: {err}"
            );
        }

        let guard = acquire();
        drop(done_tx);
        self.store(record);
        guard
    }

    /// Async flavor of [`LockTracker::track`]: the monitor is a tokio task
    /// racing a oneshot cancellation against a sleep. Dropping the
    /// acquisition future mid-await drops the oneshot sender too, which
    /// tears the monitor down just the same.
    pub(crate) async fn track_async<G>(
        &self,
        record: WaitRecord,
        acquire: impl Future<Output = G>,
    ) -> G {
        let timeout = self.effective_timeout();
        let record = Arc::new(record);
        let (done_tx, mut done_rx) = tokio::sync::oneshot::channel::<()>();

        let monitor = Monitor {
            record: Arc::clone(&record),
            last_success: Arc::clone(&self.last_success),
            sink: self.effective_sink(),
        };
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(timeout) => monitor.report(),
                    _ = &mut done_rx => return,
                }
            }
        });

        let guard = acquire.await;
        drop(done_tx);
        self.store(record);
        guard
    }
}

/// One per currently-blocking tracked attempt; stopped exactly once, when
/// that attempt completes.
struct Monitor {
    record: Arc<WaitRecord>,
    last_success: Arc<parking_lot::RwLock<Option<Arc<WaitRecord>>>>,
    sink: ReportSink,
}

impl Monitor {
    fn run(self, timeout: Duration, done_rx: mpsc::Receiver<()>) {
        loop {
            match done_rx.recv_timeout(timeout) {
                Err(RecvTimeoutError::Timeout) => self.report(),
                // Disconnected: the acquisition completed.
                _ => return,
            }
        }
    }

    fn report(&self) {
        // Snapshot under the guard, report outside it: the sink may log,
        // allocate, or take locks of its own.
        let last = self.last_success.read().clone();
        (self.sink)(&self.record, last.as_deref());
    }
}
