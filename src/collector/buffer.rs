// src/collector/buffer.rs
//! Bounded, non-blocking event queue owned by one collector.
//!
//! Drop policy: when the queue is full the event being pushed is discarded and
//! the queued events are kept, so after an overflow the buffer holds the
//! *oldest* `capacity` events. Overflow is not an error and is only visible
//! through [`EventBuffer::dropped`].
//!
//! The lock only covers the deque itself; the reader task never holds it while
//! doing I/O, so a drain never stalls the process pipe.

use std::{
    collections::VecDeque,
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

pub struct EventBuffer<E> {
    queue:    Mutex<VecDeque<E>>,
    capacity: usize,
    dropped:  AtomicU64,
}

impl<E> EventBuffer<E> {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueue `event`; silently dropped when the buffer is full.
    pub fn push(&self, event: E) {
        let mut queue = self.lock();
        if queue.len() >= self.capacity {
            drop(queue);
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        queue.push_back(event);
    }

    /// Atomically take everything queued, oldest first.
    pub fn drain_all(&self) -> Vec<E> {
        let mut queue = self.lock();
        let full = std::mem::replace(&mut *queue, VecDeque::with_capacity(self.capacity));
        drop(queue);
        full.into()
    }

    /// Total events discarded because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    // A panic while holding the lock cannot leave the deque half-updated.
    fn lock(&self) -> MutexGuard<'_, VecDeque<E>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread};

    #[test]
    fn overflow_keeps_the_oldest_events() {
        for capacity in [1usize, 3, 100] {
            let buf = EventBuffer::new(capacity);
            for i in 0..capacity + 25 {
                buf.push(i);
            }
            let drained = buf.drain_all();
            assert_eq!(drained, (0..capacity).collect::<Vec<_>>());
            assert_eq!(buf.dropped(), 25);
        }
    }

    #[test]
    fn second_drain_is_empty() {
        let buf = EventBuffer::new(4);
        buf.push("a");
        buf.push("b");
        assert_eq!(buf.drain_all(), vec!["a", "b"]);
        assert!(buf.drain_all().is_empty());
    }

    #[test]
    fn drain_frees_room_for_new_events() {
        let buf = EventBuffer::new(2);
        buf.push(1);
        buf.push(2);
        buf.push(3);
        assert_eq!(buf.drain_all(), vec![1, 2]);
        buf.push(4);
        assert_eq!(buf.drain_all(), vec![4]);
    }

    #[test]
    fn concurrent_push_and_drain_lose_nothing_below_capacity() {
        let buf = Arc::new(EventBuffer::new(10_000));
        let producer = {
            let buf = Arc::clone(&buf);
            thread::spawn(move || (0..5_000).for_each(|i| buf.push(i)))
        };

        let mut seen = Vec::new();
        while !producer.is_finished() {
            seen.extend(buf.drain_all());
        }
        producer.join().unwrap();
        seen.extend(buf.drain_all());

        assert_eq!(seen, (0..5_000).collect::<Vec<_>>());
        assert_eq!(buf.dropped(), 0);
    }
}
