//! # Dirty Queue
//!
//! FIFO of indices awaiting transfer between two buffer copies, plus a
//! "queued" bitset so an index is pending at most once per transfer.
//!
//! Pushing an index that is already pending is O(1) and does nothing, which
//! is what makes repeated writes to one index between commits coalesce.

use std::collections::VecDeque;

/// Pending-transfer queue with membership marks.
#[derive(Clone, Debug, Default)]
pub struct DirtyQueue {
    /// Indices in first-dirtied order.
    queue: VecDeque<usize>,
    /// Bitset: 1 = queued. 64 indices per u64.
    marks: Vec<u64>,
}

impl DirtyQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `index` unless it is already pending.
    ///
    /// Returns `true` if the index was newly queued.
    #[inline]
    pub fn push(&mut self, index: usize) -> bool {
        let word = index / 64;
        let mask = 1u64 << (index % 64);
        if word >= self.marks.len() {
            self.marks.resize(word + 1, 0);
        }
        if self.marks[word] & mask != 0 {
            return false;
        }
        self.marks[word] |= mask;
        self.queue.push_back(index);
        true
    }

    /// Takes the oldest pending index and clears its mark.
    #[inline]
    pub fn pop(&mut self) -> Option<usize> {
        let index = self.queue.pop_front()?;
        self.marks[index / 64] &= !(1u64 << (index % 64));
        Some(index)
    }

    /// Whether `index` is pending.
    #[inline]
    #[must_use]
    pub fn is_queued(&self, index: usize) -> bool {
        self.marks
            .get(index / 64)
            .is_some_and(|word| word & (1u64 << (index % 64)) != 0)
    }

    /// Number of pending indices.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is pending.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drops every pending index `>= bound` and trims the mark bitset.
    ///
    /// Returns the number of indices dropped.
    pub fn purge_from(&mut self, bound: usize) -> usize {
        let before = self.queue.len();
        self.queue.retain(|&index| index < bound);
        let words = bound.div_ceil(64);
        self.marks.truncate(words);
        if bound % 64 != 0 {
            if let Some(last) = self.marks.last_mut() {
                *last &= (1u64 << (bound % 64)) - 1;
            }
        }
        before - self.queue.len()
    }

    /// Drops everything pending.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.marks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_coalesces() {
        let mut queue = DirtyQueue::new();
        assert!(queue.push(5));
        assert!(!queue.push(5));
        assert!(queue.push(130));
        assert_eq!(queue.len(), 2);
        assert!(queue.is_queued(130));
        assert!(!queue.is_queued(6));
    }

    #[test]
    fn test_pop_is_fifo_and_clears_mark() {
        let mut queue = DirtyQueue::new();
        queue.push(9);
        queue.push(2);
        assert_eq!(queue.pop(), Some(9));
        assert!(!queue.is_queued(9));
        assert!(queue.push(9));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), Some(9));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_purge_from() {
        let mut queue = DirtyQueue::new();
        for index in [3, 70, 64, 200, 10] {
            queue.push(index);
        }
        assert_eq!(queue.purge_from(65), 2);
        assert_eq!(queue.len(), 3);
        assert!(queue.is_queued(64));
        assert!(!queue.is_queued(70));
        assert!(queue.push(70));
    }
}
