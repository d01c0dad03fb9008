//! Blocking FIFO queue shared between threads.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::guarded::GuardedNotify;

/// FIFO queue with an optional capacity.
///
/// A `maximum_size` of `0` means unbounded. Every query is a snapshot taken
/// under the lock and may be stale by the time the caller looks at it.
#[derive(Debug)]
pub struct SynchronizedQueue<T> {
    // Set once at construction, read without the lock.
    maximum_size: usize,
    queue: GuardedNotify<VecDeque<T>>,
}

impl<T> Default for SynchronizedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SynchronizedQueue<T> {
    /// Unbounded queue.
    pub fn new() -> Self {
        Self::with_maximum_size(0)
    }

    /// Queue holding at most `maximum_size` items; `0` means unbounded.
    pub fn with_maximum_size(maximum_size: usize) -> Self {
        Self {
            maximum_size,
            queue: GuardedNotify::new(VecDeque::new()),
        }
    }

    pub fn maximum_size(&self) -> usize {
        self.maximum_size
    }

    pub fn is_empty(&self) -> bool {
        self.queue.with_lock(|queue| queue.is_empty())
    }

    pub fn is_full(&self) -> bool {
        if self.maximum_size == 0 {
            return false;
        }
        self.queue.with_lock(|queue| queue.len() == self.maximum_size)
    }

    pub fn len(&self) -> usize {
        self.queue.with_lock(|queue| queue.len())
    }

    fn has_room(&self, queue: &VecDeque<T>) -> bool {
        self.maximum_size == 0 || queue.len() < self.maximum_size
    }

    /// Append `item`, blocking while a bounded queue is full.
    pub fn push(&self, item: T) {
        self.queue
            .with_lock_and_notify(|queue| self.has_room(queue), |queue| queue.push_back(item));
    }

    /// Remove the front item, blocking while the queue is empty.
    pub fn pop(&self) -> T {
        self.queue.with_lock_and_notify(
            |queue| !queue.is_empty(),
            |queue| {
                queue
                    .pop_front()
                    .unwrap_or_else(|| unreachable!("woken with an empty queue"))
            },
        )
    }

    /// Remove every queued item without blocking, waking blocked pushers.
    pub fn drain(&self) -> Vec<T> {
        self.queue.with_lock_and_notify(|_| true, |queue| queue.drain(..).collect())
    }

    /// Block until at least one item is queued. Does not consume it.
    pub fn wait_for_not_empty(&self) {
        self.queue.wait_for(|queue| !queue.is_empty());
    }

    /// Block until an item is queued or `deadline` passes. Returns whether the
    /// queue was non-empty.
    pub fn wait_for_not_empty_until(&self, deadline: Instant) -> bool {
        self.queue.wait_for_until(|queue| !queue.is_empty(), deadline)
    }

    pub fn wait_for_not_empty_timeout(&self, timeout: Duration) -> bool {
        self.queue.wait_for_timeout(|queue| !queue.is_empty(), timeout)
    }

    /// Block until a push would not block. Returns at once when unbounded.
    pub fn wait_for_not_full(&self) {
        if self.maximum_size == 0 {
            return;
        }
        self.queue.wait_for(|queue| self.has_room(queue));
    }

    pub fn wait_for_not_full_timeout(&self, timeout: Duration) -> bool {
        if self.maximum_size == 0 {
            return true;
        }
        self.queue.wait_for_timeout(|queue| self.has_room(queue), timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn unbounded_basics() {
        let queue = SynchronizedQueue::new();
        assert_eq!(queue.maximum_size(), 0);
        assert!(queue.is_empty());
        assert!(!queue.is_full());
        queue.push("test".to_string());
        assert!(!queue.is_full());
        assert!(!queue.is_empty());
        assert_eq!(queue.maximum_size(), 0);
    }

    #[test]
    fn bounded_reports_full() {
        let queue = SynchronizedQueue::with_maximum_size(1);
        assert_eq!(queue.maximum_size(), 1);
        assert!(queue.is_empty());
        assert!(!queue.is_full());
        queue.push("test");
        assert!(queue.is_full());
        assert!(!queue.is_empty());
    }

    #[test]
    fn pops_in_push_order() {
        let queue = SynchronizedQueue::new();
        for word in ["one", "two", "three"] {
            queue.push(word);
        }
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop(), "one");
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), "two");
        assert_eq!(queue.pop(), "three");
        assert!(queue.is_empty());
    }

    #[test]
    fn full_iff_at_capacity() {
        let queue = SynchronizedQueue::with_maximum_size(3);
        for n in 0..3 {
            assert!(!queue.is_full());
            queue.push(n);
        }
        assert!(queue.is_full());
        queue.pop();
        assert!(!queue.is_full());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn push_blocks_until_pop_frees_space() {
        let queue = Arc::new(SynchronizedQueue::with_maximum_size(1));
        queue.push(1);

        let pushed = Arc::new(AtomicBool::new(false));
        let pusher = {
            let queue = Arc::clone(&queue);
            let pushed = Arc::clone(&pushed);
            thread::spawn(move || {
                queue.push(2);
                pushed.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!pushed.load(Ordering::SeqCst));

        assert_eq!(queue.pop(), 1);
        pusher.join().unwrap();
        assert!(pushed.load(Ordering::SeqCst));
        assert_eq!(queue.pop(), 2);
    }

    #[test]
    fn pop_blocks_until_push() {
        let queue = Arc::new(SynchronizedQueue::new());
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop())
        };
        thread::sleep(Duration::from_millis(20));
        queue.push(42);
        assert_eq!(consumer.join().unwrap(), 42);
    }

    #[test]
    fn fifo_across_threads() {
        let queue = Arc::new(SynchronizedQueue::with_maximum_size(4));
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for n in 0..100 {
                    queue.push(n);
                }
            })
        };
        let received: Vec<i32> = (0..100).map(|_| queue.pop()).collect();
        producer.join().unwrap();
        assert_eq!(received, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn wait_for_not_empty_times_out() {
        let queue: SynchronizedQueue<u8> = SynchronizedQueue::new();
        assert!(!queue.wait_for_not_empty_timeout(Duration::from_millis(20)));
        assert!(!queue.wait_for_not_empty_until(Instant::now()));
        queue.push(1);
        assert!(queue.wait_for_not_empty_timeout(Duration::from_millis(20)));
        queue.wait_for_not_empty();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn wait_for_not_full() {
        let unbounded: SynchronizedQueue<u8> = SynchronizedQueue::new();
        unbounded.wait_for_not_full();
        assert!(unbounded.wait_for_not_full_timeout(Duration::ZERO));

        let bounded = SynchronizedQueue::with_maximum_size(1);
        bounded.push(1);
        assert!(!bounded.wait_for_not_full_timeout(Duration::from_millis(20)));
        bounded.pop();
        assert!(bounded.wait_for_not_full_timeout(Duration::ZERO));
        bounded.wait_for_not_full();
    }

    #[test]
    fn drain_empties_and_unblocks_pushers() {
        let queue = Arc::new(SynchronizedQueue::with_maximum_size(1));
        queue.push(1);
        let pusher = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(2))
        };
        thread::sleep(Duration::from_millis(20));
        assert_eq!(queue.drain(), vec![1]);
        pusher.join().unwrap();
        assert_eq!(queue.drain(), vec![2]);
        assert!(queue.is_empty());
    }
}
