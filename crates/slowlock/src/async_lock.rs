//! Tracked async locks over `tokio::sync`.
//!
//! Same tracking contract as the sync types: a blocked acquisition emits a
//! report per elapsed timeout interval until it completes. The monitor is
//! a tokio task instead of a thread, and dropping the acquisition future
//! mid-await tears the monitor down along with it.

use std::fmt;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::TryLockError;

use crate::config::Config;
use crate::record::{CallerInfo, WaitRecord};
use crate::tracker::LockTracker;

// ── AsyncMutex ───────────────────────────────────────────────

/// Tokio twin of [`Mutex`](crate::Mutex): a tracked wrapper around
/// `tokio::sync::Mutex`.
pub struct AsyncMutex<T> {
    tracker: LockTracker,
    inner: tokio::sync::Mutex<T>,
}

impl<T> AsyncMutex<T> {
    /// Create a tracked async mutex with the default configuration.
    pub fn new(value: T) -> Self {
        Self::with_config(Config::default(), value)
    }

    /// Create a tracked async mutex from `config`.
    pub fn with_config(config: Config, value: T) -> Self {
        Self {
            tracker: LockTracker::new(config),
            inner: tokio::sync::Mutex::new(value),
        }
    }

    /// Acquire the lock. Caller info and the wait start time are captured
    /// when `lock()` is called, not when the returned future first polls.
    #[track_caller]
    pub fn lock(&self) -> impl Future<Output = AsyncMutexGuard<'_, T>> {
        let record = WaitRecord::new(self.tracker.annotation(), CallerInfo::capture());
        async move {
            // Uncontended: no monitor task needed.
            if let Ok(guard) = self.inner.try_lock() {
                self.tracker.commit(record);
                return AsyncMutexGuard(guard);
            }
            AsyncMutexGuard(self.tracker.track_async(record, self.inner.lock()).await)
        }
    }

    /// Attempt to acquire the lock without waiting. Never tracked.
    pub fn try_lock(&self) -> Result<AsyncMutexGuard<'_, T>, TryLockError> {
        self.inner.try_lock().map(AsyncMutexGuard)
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

impl<T: Default> Default for AsyncMutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for AsyncMutex<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for AsyncMutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("AsyncMutex");
        match self.try_lock() {
            Ok(guard) => s.field("data", &&*guard),
            Err(_) => s.field("data", &format_args!("<locked>")),
        };
        s.finish()
    }
}

/// Guard for [`AsyncMutex`]; releases the lock on drop.
#[must_use = "if unused the AsyncMutex will immediately unlock"]
pub struct AsyncMutexGuard<'a, T>(tokio::sync::MutexGuard<'a, T>);

impl<T> Deref for AsyncMutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for AsyncMutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

// ── AsyncRwLock ──────────────────────────────────────────────

/// Tokio twin of [`RwLock`](crate::RwLock): a tracked wrapper around
/// `tokio::sync::RwLock`, with the same off-by-default read tracking.
pub struct AsyncRwLock<T> {
    tracker: LockTracker,
    track_reads: AtomicBool,
    inner: tokio::sync::RwLock<T>,
}

impl<T> AsyncRwLock<T> {
    /// Create a tracked async reader/writer lock with the default
    /// configuration.
    pub fn new(value: T) -> Self {
        Self::with_config(Config::default(), value)
    }

    /// Create a tracked async reader/writer lock from `config`.
    pub fn with_config(config: Config, value: T) -> Self {
        Self {
            tracker: LockTracker::new(config),
            track_reads: AtomicBool::new(false),
            inner: tokio::sync::RwLock::new(value),
        }
    }

    /// Toggle tracking of future read acquisitions. Same contract as
    /// [`RwLock::set_track_reads`](crate::RwLock::set_track_reads).
    pub fn set_track_reads(&self, track: bool) {
        self.track_reads.store(track, Ordering::Relaxed);
    }

    /// Acquire the lock exclusively.
    #[track_caller]
    pub fn write(&self) -> impl Future<Output = AsyncRwLockWriteGuard<'_, T>> {
        let record = WaitRecord::new(self.tracker.annotation(), CallerInfo::capture());
        async move {
            if let Ok(guard) = self.inner.try_write() {
                self.tracker.commit(record);
                return AsyncRwLockWriteGuard(guard);
            }
            AsyncRwLockWriteGuard(self.tracker.track_async(record, self.inner.write()).await)
        }
    }

    /// Attempt an exclusive acquisition without waiting. Never tracked.
    pub fn try_write(&self) -> Result<AsyncRwLockWriteGuard<'_, T>, TryLockError> {
        self.inner.try_write().map(AsyncRwLockWriteGuard)
    }

    /// Acquire the lock shared. Untracked by default; tracked like the
    /// write side once read tracking is enabled.
    #[track_caller]
    pub fn read(&self) -> impl Future<Output = AsyncRwLockReadGuard<'_, T>> {
        let caller = CallerInfo::capture();
        async move {
            if !self.track_reads.load(Ordering::Relaxed) {
                return AsyncRwLockReadGuard(self.inner.read().await);
            }
            let record = WaitRecord::new(self.tracker.annotation(), caller);
            if let Ok(guard) = self.inner.try_read() {
                self.tracker.commit(record);
                return AsyncRwLockReadGuard(guard);
            }
            AsyncRwLockReadGuard(self.tracker.track_async(record, self.inner.read()).await)
        }
    }

    /// Attempt a shared acquisition without waiting. Never tracked,
    /// regardless of the read-tracking flag.
    pub fn try_read(&self) -> Result<AsyncRwLockReadGuard<'_, T>, TryLockError> {
        self.inner.try_read().map(AsyncRwLockReadGuard)
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

impl<T: Default> Default for AsyncRwLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for AsyncRwLock<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for AsyncRwLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("AsyncRwLock");
        match self.try_read() {
            Ok(guard) => s.field("data", &&*guard),
            Err(_) => s.field("data", &format_args!("<locked>")),
        };
        s.finish()
    }
}

/// Shared guard for [`AsyncRwLock`]; releases the hold on drop.
#[must_use = "if unused the AsyncRwLock will immediately unlock"]
pub struct AsyncRwLockReadGuard<'a, T>(tokio::sync::RwLockReadGuard<'a, T>);

impl<T> Deref for AsyncRwLockReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

/// Exclusive guard for [`AsyncRwLock`]; releases the hold on drop.
#[must_use = "if unused the AsyncRwLock will immediately unlock"]
pub struct AsyncRwLockWriteGuard<'a, T>(tokio::sync::RwLockWriteGuard<'a, T>);

impl<T> Deref for AsyncRwLockWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> DerefMut for AsyncRwLockWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lock_commits_a_last_successful_record() {
        let lock = Config::new().annotation("async commit").async_mutex(());
        assert!(lock.tracker.last_successful().is_none());

        drop(lock.lock().await);

        let last = lock.tracker.last_successful().expect("committed");
        assert_eq!(last.annotation(), Some("async commit"));
        assert!(last.caller().file().ends_with("async_lock.rs"));
    }

    #[tokio::test]
    async fn try_lock_never_commits() {
        let lock = AsyncMutex::new(3u32);
        {
            let guard = lock.try_lock().expect("uncontended");
            assert_eq!(*guard, 3);
        }
        assert!(lock.tracker.last_successful().is_none());
    }

    #[tokio::test]
    async fn untracked_read_does_not_commit_tracked_read_does() {
        let lock = AsyncRwLock::new(());
        drop(lock.read().await);
        assert!(lock.tracker.last_successful().is_none());

        lock.set_track_reads(true);
        drop(lock.read().await);
        assert!(lock.tracker.last_successful().is_some());
    }

    #[tokio::test]
    async fn write_guard_mutates() {
        let lock = AsyncRwLock::new(0u32);
        *lock.write().await += 41;
        *lock.write().await += 1;
        assert_eq!(*lock.read().await, 42);
    }
}
