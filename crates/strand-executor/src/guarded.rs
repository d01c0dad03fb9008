//! Monitors: a value that can only be touched while holding its lock.
//!
//! [`Guarded`] is the plain variant. [`GuardedNotify`] adds a condition
//! variable so callers can block until the value reaches some state, and
//! publish state changes to whoever is waiting.
//!
//! A panic inside an action poisons the std mutex; the data is still
//! structurally valid for every use in this crate, so poisoning is ignored
//! rather than propagated.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A value behind a mutex.
#[derive(Debug, Default)]
pub struct Guarded<T> {
    data: Mutex<T>,
}

impl<T> Guarded<T> {
    pub fn new(data: T) -> Self {
        Self {
            data: Mutex::new(data),
        }
    }

    /// Run `action` against the value while holding the lock.
    pub fn with_lock<R>(&self, action: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        action(&mut *guard)
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A value behind a mutex, paired with a condition variable.
#[derive(Debug, Default)]
pub struct GuardedNotify<T> {
    data: Mutex<T>,
    condition: Condvar,
}

impl<T> GuardedNotify<T> {
    pub fn new(data: T) -> Self {
        Self {
            data: Mutex::new(data),
            condition: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, T> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until `condition` holds, returning with the lock still held.
    fn lock_when(&self, mut condition: impl FnMut(&T) -> bool) -> MutexGuard<'_, T> {
        let guard = self.lock();
        self.condition
            .wait_while(guard, |data| !condition(&*data))
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `action` against the value while holding the lock. Never blocks on
    /// the condition and notifies nobody.
    pub fn with_lock<R>(&self, action: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.lock();
        action(&mut *guard)
    }

    /// Block until `condition` holds.
    ///
    /// The lock is released while sleeping and `condition` is re-evaluated on
    /// every wake-up, so spurious wake-ups are harmless. Blocks forever if the
    /// condition never becomes true.
    pub fn wait_for(&self, condition: impl FnMut(&T) -> bool) {
        drop(self.lock_when(condition));
    }

    /// Block until `condition` holds or `deadline` passes.
    ///
    /// Returns the result of the last evaluation of `condition`: `true` if it
    /// was satisfied, `false` on timeout.
    pub fn wait_for_until(&self, mut condition: impl FnMut(&T) -> bool, deadline: Instant) -> bool {
        let mut guard = self.lock();
        loop {
            if condition(&*guard) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let (next, _) = self
                .condition
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            guard = next;
        }
    }

    /// Relative form of [`wait_for_until`](Self::wait_for_until).
    pub fn wait_for_timeout(&self, condition: impl FnMut(&T) -> bool, timeout: Duration) -> bool {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.wait_for_until(condition, deadline),
            None => {
                self.wait_for(condition);
                true
            }
        }
    }

    /// Block until `condition` holds, run `action` under the same lock, then
    /// release the lock and wake the waiters.
    ///
    /// Returns whatever `action` returns. All waiters are woken, not just one:
    /// a single condition variable serves waiters with different predicates
    /// (a bounded queue has both "not full" and "not empty" waiters), and
    /// waking only one of them could pick a waiter whose predicate is still
    /// false and lose the wake-up.
    pub fn with_lock_and_notify<R>(
        &self,
        condition: impl FnMut(&T) -> bool,
        action: impl FnOnce(&mut T) -> R,
    ) -> R {
        let mut guard = self.lock_when(condition);
        let result = action(&mut *guard);
        drop(guard);
        self.condition.notify_all();
        result
    }
}
