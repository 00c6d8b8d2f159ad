//! Ring Buffer Implementation

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Default buffer capacity (50 samples = 5 s at 10Hz)
pub const DEFAULT_CAPACITY: usize = 50;

/// Fixed-capacity FIFO buffer, one writer and many readers.
///
/// The lock is held only for a single push or a single copy, so a reader
/// either sees an append completely or not at all.
pub struct RingBuffer<T> {
    /// Buffered entries, oldest at the front
    storage: RwLock<VecDeque<T>>,
    /// Capacity of the buffer
    capacity: usize,
    /// Total entries written (for statistics)
    total_written: AtomicUsize,
}

impl<T: Clone> RingBuffer<T> {
    /// Create a new ring buffer with given capacity
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            storage: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            total_written: AtomicUsize::new(0),
        }
    }

    /// Create a buffer with default capacity (50 entries)
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    // Entries are only ever replaced whole, so a poisoned lock still guards
    // a consistent deque.
    fn read(&self) -> RwLockReadGuard<'_, VecDeque<T>> {
        self.storage.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, VecDeque<T>> {
        self.storage.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Push an entry into the buffer (evicts oldest if full)
    pub fn push(&self, item: T) {
        {
            let mut storage = self.write();
            if storage.len() >= self.capacity {
                storage.pop_front();
            }
            storage.push_back(item);
        }
        self.total_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy of the last `last_k` entries, oldest first
    pub fn snapshot(&self, last_k: usize) -> Vec<T> {
        let storage = self.read();
        let count = last_k.min(storage.len());
        storage.iter().skip(storage.len() - count).cloned().collect()
    }

    /// Most recent entry
    pub fn latest(&self) -> Option<T> {
        self.read().back().cloned()
    }

    /// Get the number of entries currently in the buffer
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if buffer is full
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    /// Get the buffer capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get fill ratio (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        self.len() as f64 / self.capacity as f64
    }

    /// Get total entries written (for statistics)
    pub fn total_written(&self) -> usize {
        self.total_written.load(Ordering::Relaxed)
    }

    /// Clear the buffer
    pub fn clear(&self) {
        self.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    #[test]
    fn test_push_and_snapshot() {
        let buffer = RingBuffer::new(10);

        for i in 0..5u64 {
            buffer.push(i * 100);
        }

        assert_eq!(buffer.len(), 5);

        let items = buffer.snapshot(3);
        assert_eq!(items, vec![200, 300, 400]);
        assert_eq!(buffer.latest(), Some(400));
    }

    #[test]
    fn test_evicts_oldest() {
        let buffer = RingBuffer::new(5);

        for i in 0..10u32 {
            buffer.push(i);
        }

        assert_eq!(buffer.len(), 5);
        assert!(buffer.is_full());
        assert_eq!(buffer.snapshot(50), vec![5, 6, 7, 8, 9]);
        assert_eq!(buffer.total_written(), 10);
    }

    #[test]
    fn test_fill_ratio() {
        let buffer = RingBuffer::new(100);
        assert_eq!(buffer.fill_ratio(), 0.0);

        for i in 0..50u8 {
            buffer.push(i);
        }

        assert!((buffer.fill_ratio() - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_concurrent_readers_see_whole_entries() {
        let buffer = Arc::new(RingBuffer::new(50));

        let writer = {
            let buffer = Arc::clone(&buffer);
            std::thread::spawn(move || {
                for i in 0..5_000u64 {
                    buffer.push((i, i * 2));
                }
            })
        };

        let reader = {
            let buffer = Arc::clone(&buffer);
            std::thread::spawn(move || {
                for _ in 0..1_000 {
                    let snapshot = buffer.snapshot(50);
                    assert!(snapshot.len() <= 50);
                    assert!(snapshot.iter().all(|(a, b)| *b == a * 2));
                    assert!(snapshot.windows(2).all(|w| w[1].0 == w[0].0 + 1));
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
        assert_eq!(buffer.len(), 50);
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_capacity(capacity in 1usize..64, pushes in 0usize..256) {
            let buffer = RingBuffer::new(capacity);
            for i in 0..pushes {
                buffer.push(i);
            }
            prop_assert_eq!(buffer.len(), pushes.min(capacity));
            prop_assert_eq!(buffer.latest(), pushes.checked_sub(1));
        }
    }
}
