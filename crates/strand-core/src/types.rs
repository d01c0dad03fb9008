use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point in time on the monotonic clock.
///
/// `Instant` never goes backwards and ignores wall-clock adjustments, which is
/// what deadline waits need.
pub type Deadline = std::time::Instant;

/// Identifier of a scheduled call, unique within the executor that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallId(u64);

impl CallId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "call-{}", self.0)
    }
}

/// Hands out increasing call ids; never reuses one.
///
/// Safe to share between threads: concurrent callers never observe the same id.
#[derive(Debug)]
pub struct CallIdAllocator {
    next: AtomicU64,
}

impl CallIdAllocator {
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> CallId {
        CallId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for CallIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
