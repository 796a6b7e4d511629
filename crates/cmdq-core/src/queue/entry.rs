//! Queue entry and its ordering.

use std::cmp::Ordering;

/// One pending entry.
///
/// Ordered by `(priority, sequence)` ascending; the payload never takes part
/// in the comparison. Sequences are unique, so two entries never tie.
#[derive(Debug)]
pub struct QueueEntry<T> {
    pub priority: i32,
    pub sequence: u64,
    pub item: T,
}

impl<T> QueueEntry<T> {
    pub fn new(priority: i32, sequence: u64, item: T) -> Self {
        Self {
            priority,
            sequence,
            item,
        }
    }

    fn key(&self) -> (i32, u64) {
        (self.priority, self.sequence)
    }
}

impl<T> PartialEq for QueueEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<T> Eq for QueueEntry<T> {}

impl<T> PartialOrd for QueueEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for QueueEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Heap adapter: `BinaryHeap` is a max-heap, so reverse the entry order to
/// pop the smallest `(priority, sequence)` first.
#[derive(Debug)]
pub(crate) struct MinFirst<T>(pub(crate) QueueEntry<T>);

impl<T> PartialEq for MinFirst<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for MinFirst<T> {}

impl<T> PartialOrd for MinFirst<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for MinFirst<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.0.cmp(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::lower_priority_first((10, 9), (50, 1))]
    #[case::fifo_within_priority((50, 1), (50, 2))]
    #[case::negative_priorities((-5, 3), (0, 1))]
    fn entries_order_by_priority_then_sequence(#[case] first: (i32, u64), #[case] second: (i32, u64)) {
        let a = QueueEntry::new(first.0, first.1, "a");
        let b = QueueEntry::new(second.0, second.1, "b");
        assert!(a < b);
    }

    #[test]
    fn payload_does_not_affect_ordering() {
        let a = QueueEntry::new(1, 1, "zzz");
        let b = QueueEntry::new(1, 1, "aaa");
        assert_eq!(a, b);
    }

    #[test]
    fn heap_pops_smallest_key() {
        let mut heap = std::collections::BinaryHeap::new();
        heap.push(MinFirst(QueueEntry::new(50, 1, ())));
        heap.push(MinFirst(QueueEntry::new(10, 2, ())));
        heap.push(MinFirst(QueueEntry::new(50, 0, ())));

        let order: Vec<(i32, u64)> = std::iter::from_fn(|| heap.pop())
            .map(|e| (e.0.priority, e.0.sequence))
            .collect();
        assert_eq!(order, vec![(10, 2), (50, 0), (50, 1)]);
    }
}
