//! Slow-lock tracking: drop-in lock replacements that report acquisitions
//! taking longer than a configurable threshold.
//!
//! The locks in this crate behave exactly like the primitives they wrap
//! (`parking_lot` for [`Mutex`] and [`RwLock`], `tokio::sync` for
//! [`AsyncMutex`] and [`AsyncRwLock`]). The addition is purely
//! observational: every tracked blocking acquisition that outlasts its
//! effective timeout emits a report to a pluggable sink, once per elapsed
//! interval, until the lock is finally acquired. Slow acquisitions are
//! reported, never cancelled or failed; a true deadlock keeps reporting
//! forever, which is the diagnostic signal.
//!
//! ```
//! use std::time::Duration;
//!
//! let lock = slowlock::Config::new()
//!     .annotation("session table")
//!     .timeout(Duration::from_millis(500))
//!     .mutex(0u64);
//!
//! *lock.lock() += 1;
//! ```
//!
//! Each report carries a [`WaitRecord`] for the stuck attempt (annotation,
//! call site, wait start, elapsed) plus the record of the lock's last
//! successful acquisition, which is usually the holder that is starving
//! it. Reports go to the per-lock sink if the [`Config`] carries one,
//! otherwise to the process-wide default, a `tracing` warning with target
//! `slowlock`. The process-wide timeout (10s) and sink are meant to be
//! replaced once at startup via [`set_default_timeout`] and
//! [`set_default_report_sink`], before locks start contending.
//!
//! `try_lock`-style acquisitions are never instrumented: no record, no
//! monitor, no effect on the last-successful bookkeeping. Read
//! acquisitions on the reader/writer locks are untracked by default too
//! ([`RwLock::set_track_reads`] opts in), keeping hot read paths free of
//! overhead.

mod async_lock;
mod config;
mod mutex;
mod record;
mod rwlock;
mod tracker;

pub use async_lock::{
    AsyncMutex, AsyncMutexGuard, AsyncRwLock, AsyncRwLockReadGuard, AsyncRwLockWriteGuard,
};
pub use config::{Config, set_default_report_sink, set_default_timeout};
pub use mutex::{Mutex, MutexGuard};
pub use record::{CallerInfo, ReportSink, WaitRecord};
pub use rwlock::{ReadLockView, RwLock, RwLockReadGuard, RwLockWriteGuard};
