//! FIFO handoff between a frame producer and a network task.
//!
//! [`FrameQueue`] is shared behind an `Arc` by exactly one producer and
//! one consumer. `push` and `try_pop` never block, so a render or capture
//! loop can use them directly; the sender awaits [`FrameQueue::pop`]
//! instead of spinning on `try_pop`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;

/// Default bound for frame queues: one frame in flight, one pending.
pub const DEFAULT_FRAME_QUEUE_CAPACITY: usize = 2;

/// Thread-safe FIFO queue with a drop-oldest overflow policy.
#[derive(Debug)]
pub struct FrameQueue<T> {
    items: Mutex<VecDeque<T>>,
    /// `None` means unbounded.
    capacity: Option<usize>,
    notify: Notify,
    dropped: AtomicU64,
}

impl<T> FrameQueue<T> {
    /// A queue holding at most `capacity` items. On overflow the oldest
    /// item is discarded.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn bounded(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be at least 1");
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: Some(capacity),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// A queue that grows without limit.
    pub fn unbounded() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            capacity: None,
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueue `item`. Never blocks beyond the internal lock.
    pub fn push(&self, item: T) {
        {
            let mut items = self.lock();
            if let Some(cap) = self.capacity {
                while items.len() >= cap {
                    items.pop_front();
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
            items.push_back(item);
        }
        self.notify.notify_one();
    }

    /// Remove and return the oldest item, or `None` if the queue is empty.
    pub fn try_pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Wait until an item is available and return it.
    ///
    /// Cancel-safe: dropping the future never loses an item.
    pub async fn pop(&self) -> T {
        loop {
            if let Some(item) = self.try_pop() {
                return item;
            }
            // `notify_one` stores a permit when nobody is waiting, so a push
            // landing between `try_pop` and here still wakes us.
            self.notify.notified().await;
        }
    }

    /// Number of pending items.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Maximum number of pending items, if bounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Items discarded by the overflow policy since construction.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Discard every pending item.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        // A panic while holding the lock cannot leave the deque itself in a
        // torn state, so keep serving items after poisoning.
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T> Default for FrameQueue<T> {
    fn default() -> Self {
        Self::bounded(DEFAULT_FRAME_QUEUE_CAPACITY)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    #[test]
    fn empty_try_pop_returns_none() {
        let q: FrameQueue<u32> = FrameQueue::unbounded();
        assert!(q.try_pop().is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn push_then_pop() {
        let q = FrameQueue::unbounded();
        q.push(7);
        assert_eq!(q.len(), 1);
        assert_eq!(q.try_pop(), Some(7));
        assert!(q.try_pop().is_none());
    }

    #[test]
    fn fifo_order() {
        let q = FrameQueue::unbounded();
        for i in 1..=5 {
            q.push(i);
        }
        let popped: Vec<_> = std::iter::from_fn(|| q.try_pop()).collect();
        assert_eq!(popped, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn bounded_drops_oldest() {
        let q = FrameQueue::bounded(2);
        q.push("a");
        q.push("b");
        q.push("c");
        assert_eq!(q.len(), 2);
        assert_eq!(q.dropped(), 1);
        assert_eq!(q.try_pop(), Some("b"));
        assert_eq!(q.try_pop(), Some("c"));
    }

    #[test]
    fn clear_empties_queue() {
        let q = FrameQueue::bounded(4);
        q.push(1);
        q.push(2);
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.capacity(), Some(4));
    }

    #[test]
    #[should_panic]
    fn zero_capacity_panics() {
        let _q: FrameQueue<u8> = FrameQueue::bounded(0);
    }

    #[test]
    fn pop_waits_for_push() {
        let q = FrameQueue::unbounded();
        let mut pop = task::spawn(q.pop());
        assert_pending!(pop.poll());

        q.push(42u8);
        assert!(pop.is_woken());
        assert_ready_eq!(pop.poll(), 42);
    }

    #[test]
    fn pop_sees_push_before_first_poll() {
        let q = FrameQueue::unbounded();
        q.push(1u8);
        // The stored permit must not make a later pop return early.
        assert_eq!(q.try_pop(), Some(1));
        let mut pop = task::spawn(q.pop());
        assert_pending!(pop.poll());
    }

    #[tokio::test]
    async fn cross_thread_handoff() {
        let q = Arc::new(FrameQueue::unbounded());
        let producer = {
            let q = Arc::clone(&q);
            std::thread::spawn(move || {
                for i in 0..100u32 {
                    q.push(vec![i as u8; 64]);
                }
            })
        };

        for i in 0..100u32 {
            let item = tokio::time::timeout(Duration::from_secs(5), q.pop())
                .await
                .expect("timeout");
            assert_eq!(item, vec![i as u8; 64]);
        }
        producer.join().unwrap();
    }
}
