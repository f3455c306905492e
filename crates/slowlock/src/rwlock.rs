//! Tracked reader/writer lock and its restricted read-side view.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::Config;
use crate::record::{CallerInfo, WaitRecord};
use crate::tracker::LockTracker;

/// A drop-in replacement for `parking_lot::RwLock` that reports slow lock
/// acquisitions.
///
/// Write acquisitions are always tracked. Read acquisitions pass straight
/// through to the wrapped primitive unless read tracking is switched on
/// with [`RwLock::set_track_reads`]; the default keeps hot read paths
/// free of instrumentation.
pub struct RwLock<T> {
    tracker: LockTracker,
    track_reads: AtomicBool,
    inner: parking_lot::RwLock<T>,
}

impl<T> RwLock<T> {
    /// Create a tracked reader/writer lock with the default configuration.
    pub fn new(value: T) -> Self {
        Self::with_config(Config::default(), value)
    }

    /// Create a tracked reader/writer lock from `config`.
    pub fn with_config(config: Config, value: T) -> Self {
        Self {
            tracker: LockTracker::new(config),
            track_reads: AtomicBool::new(false),
            inner: parking_lot::RwLock::new(value),
        }
    }

    /// Toggle tracking of future read acquisitions. Not retroactive:
    /// reads already blocking keep the mode they started with. Configure
    /// before the lock sees concurrent use; a toggle racing a `read()`
    /// only makes that one read's tracking mode unspecified.
    pub fn set_track_reads(&self, track: bool) {
        self.track_reads.store(track, Ordering::Relaxed);
    }

    /// Acquire the lock exclusively, blocking the calling thread until no
    /// other holders remain. Same tracking contract as
    /// [`Mutex::lock`](crate::Mutex::lock).
    #[track_caller]
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        let record = WaitRecord::new(self.tracker.annotation(), CallerInfo::capture());
        if let Some(guard) = self.inner.try_write() {
            self.tracker.commit(record);
            return RwLockWriteGuard(guard);
        }
        RwLockWriteGuard(self.tracker.track(record, || self.inner.write()))
    }

    /// Attempt an exclusive acquisition without blocking. Never tracked.
    pub fn try_write(&self) -> Option<RwLockWriteGuard<'_, T>> {
        self.inner.try_write().map(RwLockWriteGuard)
    }

    /// Acquire the lock shared, blocking until no writer holds it.
    /// Untracked by default; with read tracking enabled this follows the
    /// full tracking contract of the write side.
    #[track_caller]
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        if !self.track_reads.load(Ordering::Relaxed) {
            return RwLockReadGuard(self.inner.read());
        }
        let record = WaitRecord::new(self.tracker.annotation(), CallerInfo::capture());
        if let Some(guard) = self.inner.try_read() {
            self.tracker.commit(record);
            return RwLockReadGuard(guard);
        }
        RwLockReadGuard(self.tracker.track(record, || self.inner.read()))
    }

    /// Attempt a shared acquisition without blocking. Never tracked,
    /// regardless of the read-tracking flag.
    pub fn try_read(&self) -> Option<RwLockReadGuard<'_, T>> {
        self.inner.try_read().map(RwLockReadGuard)
    }

    /// A view of this lock restricted to the read side, for handing to
    /// code that expects something lock-shaped but must never write.
    pub fn read_view(&self) -> ReadLockView<'_, T> {
        ReadLockView { lock: self }
    }

    /// Consume the lock, returning the protected value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }

    /// Mutable access without locking; exclusivity comes from the borrow.
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }
}

impl<T: Default> Default for RwLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for RwLock<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for RwLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("RwLock");
        match self.try_read() {
            Some(guard) => s.field("data", &&*guard),
            None => s.field("data", &format_args!("<locked>")),
        };
        s.finish()
    }
}

// ── Guards ───────────────────────────────────────────────────

/// Shared guard for [`RwLock`]; releases the hold on drop.
#[must_use = "if unused the RwLock will immediately unlock"]
pub struct RwLockReadGuard<'a, T>(parking_lot::RwLockReadGuard<'a, T>);

impl<T> Deref for RwLockReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

/// Exclusive guard for [`RwLock`]; releases the hold on drop.
#[must_use = "if unused the RwLock will immediately unlock"]
pub struct RwLockWriteGuard<'a, T>(parking_lot::RwLockWriteGuard<'a, T>);

impl<T> Deref for RwLockWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for RwLockWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

// ── Read-side view ───────────────────────────────────────────

/// Read-side-only handle over a [`RwLock`].
///
/// `lock()` is the lock's `read()`, tracking mode included. The full type
/// is never re-exposed, so the write side is unreachable through a view.
pub struct ReadLockView<'a, T> {
    lock: &'a RwLock<T>,
}

impl<'a, T> ReadLockView<'a, T> {
    /// Acquire the underlying lock shared.
    #[track_caller]
    pub fn lock(&self) -> RwLockReadGuard<'a, T> {
        self.lock.read()
    }
}

impl<T> Clone for ReadLockView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ReadLockView<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn write_commits_but_untracked_read_does_not() {
        let lock = Config::new().annotation("rw").rw_lock(0u32);

        drop(lock.read());
        assert!(lock.tracker.last_successful().is_none());

        drop(lock.write());
        assert!(lock.tracker.last_successful().is_some());
    }

    #[test]
    fn tracked_read_commits() {
        let lock = Config::new().annotation("tracked read").rw_lock(());
        lock.set_track_reads(true);
        drop(lock.read());
        let last = lock.tracker.last_successful().expect("committed");
        assert_eq!(last.annotation(), Some("tracked read"));
    }

    #[test]
    fn try_acquisitions_never_commit() {
        let lock = RwLock::new(());
        lock.set_track_reads(true);
        drop(lock.try_read().expect("uncontended"));
        drop(lock.try_write().expect("uncontended"));
        assert!(lock.tracker.last_successful().is_none());
    }

    #[test]
    fn readers_share_writers_exclude() {
        let lock = RwLock::new(1u32);
        let a = lock.read();
        let b = lock.read();
        assert_eq!(*a + *b, 2);
        assert!(lock.try_write().is_none());
        drop(a);
        drop(b);
        assert!(lock.try_write().is_some());
    }

    #[test]
    fn read_view_takes_the_read_side_only() {
        let lock = RwLock::new(7u32);
        let view = lock.read_view();

        // Readers share, so a view acquisition under an existing read
        // guard must not block.
        let outer = lock.read();
        let inner = view.lock();
        assert_eq!(*outer, *inner);
    }

    #[test]
    fn fast_write_cycles_never_invoke_the_sink() {
        let reports = Arc::new(std::sync::Mutex::new(0usize));
        let sink_reports = Arc::clone(&reports);
        let lock = Config::new()
            .timeout(Duration::from_millis(10))
            .report_sink(Arc::new(move |_, _| {
                *sink_reports.lock().unwrap() += 1;
            }))
            .rw_lock(0u64);

        for _ in 0..100 {
            *lock.write() += 1;
        }
        assert_eq!(*lock.read(), 100);
        assert_eq!(*reports.lock().unwrap(), 0);
    }
}
