//! Fixed-capacity ring buffer with FIFO eviction.

use std::num::NonZeroUsize;

/// Bounded insertion-ordered buffer.
///
/// Slots fill front to back until capacity is reached; after that every
/// push overwrites the slot at `head` (the oldest entry) and advances
/// `head`. Iteration always starts at the oldest entry.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<T>,
    head: usize,
    capacity: NonZeroUsize,
}

impl<T> RingBuffer<T> {
    /// Create an empty buffer.
    #[must_use]
    pub const fn new(capacity: NonZeroUsize) -> Self {
        Self {
            slots: Vec::new(),
            head: 0,
            capacity,
        }
    }

    /// Maximum number of entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Current number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the buffer holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether the next push will evict.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity.get()
    }

    /// Append an entry, returning the evicted oldest entry when full.
    pub fn push(&mut self, item: T) -> Option<T> {
        if !self.is_full() {
            if self.slots.capacity() == 0 {
                self.slots.reserve_exact(self.capacity.get());
            }
            self.slots.push(item);
            return None;
        }

        let evicted = std::mem::replace(&mut self.slots[self.head], item);
        self.head = (self.head + 1) % self.capacity.get();
        Some(evicted)
    }

    /// Most recently pushed entry.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        if self.slots.is_empty() {
            return None;
        }
        let idx = (self.head + self.slots.len() - 1) % self.slots.len();
        self.slots.get(idx)
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    /// Drop all entries, keeping the allocation.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Copy entries out, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ring(capacity: usize) -> RingBuffer<u32> {
        RingBuffer::new(NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn push_until_full_without_eviction() {
        let mut buf = ring(3);
        assert!(buf.is_empty());
        assert_eq!(buf.push(1), None);
        assert_eq!(buf.push(2), None);
        assert_eq!(buf.push(3), None);
        assert!(buf.is_full());
        assert_eq!(buf.to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn push_when_full_evicts_oldest() {
        let mut buf = ring(3);
        for i in 1..=3 {
            buf.push(i);
        }
        assert_eq!(buf.push(4), Some(1));
        assert_eq!(buf.push(5), Some(2));
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.to_vec(), vec![3, 4, 5]);
        assert_eq!(buf.last(), Some(&5));
    }

    #[test]
    fn wraps_around_many_times() {
        let mut buf = ring(4);
        for i in 0..103 {
            buf.push(i);
        }
        assert_eq!(buf.to_vec(), vec![99, 100, 101, 102]);
        assert_eq!(buf.last(), Some(&102));
    }

    #[test]
    fn capacity_one_keeps_latest() {
        let mut buf = ring(1);
        buf.push(7);
        assert_eq!(buf.push(8), Some(7));
        assert_eq!(buf.to_vec(), vec![8]);
        assert_eq!(buf.last(), Some(&8));
    }

    #[test]
    fn clear_resets_order() {
        let mut buf = ring(2);
        for i in 0..5 {
            buf.push(i);
        }
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.last(), None);

        buf.push(10);
        buf.push(11);
        buf.push(12);
        assert_eq!(buf.to_vec(), vec![11, 12]);
    }

    #[test]
    fn iter_is_double_ended() {
        let mut buf = ring(3);
        for i in 0..5 {
            buf.push(i);
        }
        let reversed: Vec<_> = buf.iter().rev().copied().collect();
        assert_eq!(reversed, vec![4, 3, 2]);
        assert_eq!(buf.iter().count(), 3);
    }

    proptest! {
        #[test]
        fn holds_most_recent_in_order(capacity in 1usize..32, items in proptest::collection::vec(any::<u32>(), 0..200)) {
            let mut buf = ring(capacity);
            for (i, item) in items.iter().enumerate() {
                buf.push(*item);
                prop_assert!(buf.len() <= capacity);
                prop_assert_eq!(buf.len(), (i + 1).min(capacity));
            }

            let start = items.len().saturating_sub(capacity);
            prop_assert_eq!(buf.to_vec(), items[start..].to_vec());
            prop_assert_eq!(buf.last(), items.last());
        }
    }
}
