use std::collections::VecDeque;

use crate::error::{Result, VmError};

/// FIFO of resident virtual pages, oldest at the head.
///
/// Order is admission order only; touching a resident page never moves it.
#[derive(Debug, Clone)]
pub struct ReplacementQueue {
    pages: VecDeque<usize>,
    capacity: usize,
}

impl ReplacementQueue {
    /// Empty queue holding at most `capacity` pages
    pub fn new(capacity: usize) -> Self {
        ReplacementQueue {
            pages: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `page` at the tail. The caller evicts first when full.
    pub fn admit(&mut self, page: usize) -> Result<()> {
        if self.is_full() {
            return Err(VmError::CapacityExceeded { capacity: self.capacity });
        }
        self.pages.push_back(page);
        Ok(())
    }

    /// Remove and return the longest-resident page
    pub fn evict_oldest(&mut self) -> Result<usize> {
        self.pages.pop_front().ok_or(VmError::Empty)
    }

    /// Linear membership test, bounded by the capacity
    #[inline]
    pub fn contains(&self, page: usize) -> bool {
        self.pages.contains(&page)
    }

    /// Number of resident pages
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// True when nothing is resident
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// True when the next admit needs an eviction first
    pub fn is_full(&self) -> bool {
        self.pages.len() >= self.capacity
    }

    /// Max resident pages
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Resident pages, oldest first
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.pages.iter().copied()
    }

    /// Remove every page, oldest first
    pub fn drain(&mut self) -> impl Iterator<Item = usize> + '_ {
        self.pages.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut q = ReplacementQueue::new(3);
        q.admit(7).unwrap();
        q.admit(0).unwrap();
        q.admit(1).unwrap();
        assert_eq!(q.iter().collect::<Vec<_>>(), vec![7, 0, 1]);

        assert_eq!(q.evict_oldest().unwrap(), 7);
        assert_eq!(q.evict_oldest().unwrap(), 0);
        q.admit(2).unwrap();
        assert_eq!(q.iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut q = ReplacementQueue::new(2);
        q.admit(1).unwrap();
        q.admit(2).unwrap();
        assert!(q.is_full());
        assert!(matches!(q.admit(3), Err(VmError::CapacityExceeded { capacity: 2 })));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn test_empty() {
        let mut q = ReplacementQueue::new(4);
        assert!(q.is_empty());
        assert!(matches!(q.evict_oldest(), Err(VmError::Empty)));
    }

    #[test]
    fn test_contains_does_not_reorder() {
        let mut q = ReplacementQueue::new(4);
        for page in [3, 1, 4] {
            q.admit(page).unwrap();
        }
        assert!(q.contains(1));
        assert!(!q.contains(9));
        assert_eq!(q.iter().collect::<Vec<_>>(), vec![3, 1, 4]);
    }

    #[test]
    fn test_drain() {
        let mut q = ReplacementQueue::new(4);
        q.admit(5).unwrap();
        q.admit(6).unwrap();
        assert_eq!(q.drain().collect::<Vec<_>>(), vec![5, 6]);
        assert!(q.is_empty());
        assert_eq!(q.capacity(), 4);
    }
}
