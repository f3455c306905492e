//! Tracked exclusive lock.

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::config::Config;
use crate::record::{CallerInfo, WaitRecord};
use crate::tracker::LockTracker;

/// A drop-in replacement for `parking_lot::Mutex` that reports slow lock
/// acquisitions.
///
/// Acquisitions that outlast the effective timeout are reported to the
/// configured sink once per elapsed interval until the lock is finally
/// acquired; slow acquisitions are reported, never cancelled. Mutual
/// exclusion itself is entirely the wrapped primitive's business;
/// tracking is observational only.
pub struct Mutex<T> {
    tracker: LockTracker,
    inner: parking_lot::Mutex<T>,
}

impl<T> Mutex<T> {
    /// Create a tracked mutex with the default configuration.
    pub fn new(value: T) -> Self {
        Self::with_config(Config::default(), value)
    }

    /// Create a tracked mutex from `config`.
    pub fn with_config(config: Config, value: T) -> Self {
        Self {
            tracker: LockTracker::new(config),
            inner: parking_lot::Mutex::new(value),
        }
    }

    /// Acquire the lock, blocking the calling thread until it is
    /// available. Waits that outlast the effective timeout emit a report
    /// per elapsed interval.
    #[track_caller]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        let record = WaitRecord::new(self.tracker.annotation(), CallerInfo::capture());
        // Uncontended: no monitor needed.
        if let Some(guard) = self.inner.try_lock() {
            self.tracker.commit(record);
            return MutexGuard(guard);
        }
        MutexGuard(self.tracker.track(record, || self.inner.lock()))
    }

    /// Attempt to acquire the lock without blocking. Never tracked: no
    /// record is made, no monitor runs, and the last-successful record is
    /// left untouched.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, T>> {
        self.inner.try_lock().map(MutexGuard)
    }

    /// Consume the mutex, returning the protected value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }

    /// Mutable access without locking; exclusivity comes from the borrow.
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for Mutex<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for Mutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Mutex");
        match self.try_lock() {
            Some(guard) => s.field("data", &&*guard),
            None => s.field("data", &format_args!("<locked>")),
        };
        s.finish()
    }
}

/// Guard for [`Mutex`]; releases the lock on drop.
#[must_use = "if unused the Mutex will immediately unlock"]
pub struct MutexGuard<'a, T>(parking_lot::MutexGuard<'a, T>);

impl<T> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn lock_commits_a_last_successful_record() {
        let lock = Config::new().annotation("commit test").mutex(());
        assert!(lock.tracker.last_successful().is_none());

        drop(lock.lock());

        let last = lock.tracker.last_successful().expect("committed");
        assert_eq!(last.annotation(), Some("commit test"));
        assert!(last.caller().file().ends_with("mutex.rs"));
    }

    #[test]
    fn try_lock_never_commits() {
        let lock = Mutex::new(5u32);
        {
            let guard = lock.try_lock().expect("uncontended");
            assert_eq!(*guard, 5);
        }
        assert!(lock.tracker.last_successful().is_none());

        // Contended try fails without touching anything either.
        let held = lock.lock();
        assert!(lock.try_lock().is_none());
        drop(held);
    }

    #[test]
    fn fast_acquisitions_never_invoke_the_sink() {
        let reports = Arc::new(std::sync::Mutex::new(0usize));
        let sink_reports = Arc::clone(&reports);
        let lock = Config::new()
            .timeout(Duration::from_millis(10))
            .report_sink(Arc::new(move |_, _| {
                *sink_reports.lock().unwrap() += 1;
            }))
            .mutex(0u64);

        for _ in 0..100 {
            *lock.lock() += 1;
        }
        assert_eq!(*lock.lock(), 100);
        assert_eq!(*reports.lock().unwrap(), 0);
    }

    #[test]
    fn guard_gives_mutable_access() {
        let mut lock = Mutex::new(String::from("a"));
        lock.lock().push('b');
        lock.get_mut().push('c');
        assert_eq!(lock.into_inner(), "abc");
    }
}
