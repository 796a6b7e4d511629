//! In-memory priority queue with outstanding-work tracking.

use std::collections::BinaryHeap;

use parking_lot::Mutex;
use tokio::sync::{Notify, watch};

use super::QueueError;
use super::entry::{MinFirst, QueueEntry};

struct QueueState<T> {
    heap: BinaryHeap<MinFirst<T>>,
    closed: bool,
}

/// Unbounded priority queue shared by many producers and one consumer.
///
/// - `put` never blocks (the lock only covers a heap push).
/// - `get` waits until an entry is available and returns the smallest
///   `(priority, sequence)`.
/// - every `put` adds one unit of outstanding work; `task_done` removes one;
///   `join` waits for zero.
pub struct PriorityQueue<T> {
    state: Mutex<QueueState<T>>,
    available: Notify,
    unfinished: watch::Sender<usize>,
}

impl<T> PriorityQueue<T> {
    pub fn new() -> Self {
        let (unfinished, _) = watch::channel(0);
        Self {
            state: Mutex::new(QueueState {
                heap: BinaryHeap::new(),
                closed: false,
            }),
            available: Notify::new(),
            unfinished,
        }
    }

    /// Insert an entry. Fails once the queue has been closed.
    pub fn put(&self, entry: QueueEntry<T>) -> Result<(), QueueError> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(QueueError::Closed);
            }
            // count before the entry becomes visible to the consumer
            self.unfinished.send_modify(|n| *n += 1);
            state.heap.push(MinFirst(entry));
        }
        self.available.notify_one();
        Ok(())
    }

    /// Insert a final entry and close the queue in one step.
    ///
    /// Accepted even if the queue is already closed, so an abort can follow a
    /// drain request.
    pub fn close_with(&self, entry: QueueEntry<T>) {
        {
            let mut state = self.state.lock();
            state.closed = true;
            self.unfinished.send_modify(|n| *n += 1);
            state.heap.push(MinFirst(entry));
        }
        self.available.notify_one();
    }

    /// Stop accepting entries. Returns `true` if this call closed the queue.
    pub fn close(&self) -> bool {
        let mut state = self.state.lock();
        !std::mem::replace(&mut state.closed, true)
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Pop the smallest entry if there is one.
    pub fn try_get(&self) -> Option<QueueEntry<T>> {
        self.state.lock().heap.pop().map(|e| e.0)
    }

    /// Wait for an entry and pop the smallest one.
    ///
    /// Cancel-safe: an entry is only removed in the same synchronous step that
    /// returns it.
    pub async fn get(&self) -> QueueEntry<T> {
        loop {
            if let Some(entry) = self.try_get() {
                return entry;
            }
            // notify_one leaves a permit behind when nobody waits yet,
            // so a put between try_get and here is not lost
            self.available.notified().await;
        }
    }

    /// Mark one dequeued entry as fully processed.
    pub fn task_done(&self) -> Result<(), QueueError> {
        let mut underflow = false;
        self.unfinished.send_if_modified(|n| {
            if *n == 0 {
                underflow = true;
                false
            } else {
                *n -= 1;
                true
            }
        });
        if underflow {
            Err(QueueError::TaskDoneUnderflow)
        } else {
            Ok(())
        }
    }

    /// Wait until every entry put so far has been marked done.
    pub async fn join(&self) {
        let mut rx = self.unfinished.subscribe();
        // the sender lives in `self`, so this cannot observe a closed channel
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Remove every pending entry, smallest first.
    ///
    /// The entries still count as outstanding; the caller must `task_done`
    /// each one it drops.
    pub fn drain(&self) -> Vec<QueueEntry<T>> {
        let heap = std::mem::take(&mut self.state.lock().heap);
        heap.into_sorted_vec().into_iter().rev().map(|e| e.0).collect()
    }

    /// Entries waiting to be dequeued.
    pub fn len(&self) -> usize {
        self.state.lock().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries put but not yet marked done (pending + in flight).
    pub fn unfinished(&self) -> usize {
        *self.unfinished.borrow()
    }
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    fn entry(priority: i32, sequence: u64) -> QueueEntry<&'static str> {
        QueueEntry::new(priority, sequence, "x")
    }

    #[tokio::test]
    async fn get_returns_min_by_priority_then_sequence() {
        let q = PriorityQueue::new();
        q.put(entry(50, 1)).unwrap();
        q.put(entry(10, 2)).unwrap();
        q.put(entry(50, 3)).unwrap();
        q.put(entry(10, 4)).unwrap();

        let mut order = Vec::new();
        for _ in 0..4 {
            let e = q.get().await;
            order.push((e.priority, e.sequence));
        }
        assert_eq!(order, vec![(10, 2), (10, 4), (50, 1), (50, 3)]);
    }

    #[tokio::test]
    async fn get_waits_for_a_put() {
        let q = Arc::new(PriorityQueue::new());

        let consumer = tokio::spawn({
            let q = Arc::clone(&q);
            async move { q.get().await.sequence }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!consumer.is_finished());

        q.put(entry(1, 42)).unwrap();
        let seq = timeout(Duration::from_secs(1), consumer).await.unwrap().unwrap();
        assert_eq!(seq, 42);
    }

    #[tokio::test]
    async fn join_waits_for_task_done_not_for_dequeue() {
        let q = Arc::new(PriorityQueue::new());
        q.put(entry(1, 1)).unwrap();
        let _ = q.get().await;
        assert_eq!(q.unfinished(), 1);

        let joined = timeout(Duration::from_millis(30), q.join()).await;
        assert!(joined.is_err(), "join must wait while the entry is in flight");

        q.task_done().unwrap();
        timeout(Duration::from_secs(1), q.join()).await.unwrap();
    }

    #[tokio::test]
    async fn join_on_empty_queue_returns_immediately() {
        let q: PriorityQueue<()> = PriorityQueue::new();
        timeout(Duration::from_millis(100), q.join()).await.unwrap();
    }

    #[test]
    fn task_done_more_than_put_is_an_error() {
        let q: PriorityQueue<()> = PriorityQueue::new();
        assert!(matches!(q.task_done(), Err(QueueError::TaskDoneUnderflow)));
    }

    #[test]
    fn closed_queue_rejects_put_but_takes_close_with() {
        let q = PriorityQueue::new();
        assert!(q.close());
        assert!(!q.close());
        assert!(matches!(q.put(entry(1, 1)), Err(QueueError::Closed)));

        q.close_with(entry(i32::MIN, 0));
        assert_eq!(q.len(), 1);
        assert_eq!(q.unfinished(), 1);
    }

    #[test]
    fn drain_empties_in_order_and_keeps_outstanding_count() {
        let q = PriorityQueue::new();
        q.put(entry(5, 2)).unwrap();
        q.put(entry(1, 3)).unwrap();
        q.put(entry(5, 1)).unwrap();

        let drained: Vec<_> = q.drain().into_iter().map(|e| (e.priority, e.sequence)).collect();
        assert_eq!(drained, vec![(1, 3), (5, 1), (5, 2)]);
        assert!(q.is_empty());
        assert_eq!(q.unfinished(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_producers_lose_nothing() {
        let q = Arc::new(PriorityQueue::new());
        let producers: Vec<_> = (0..8u64)
            .map(|p| {
                let q = Arc::clone(&q);
                std::thread::spawn(move || {
                    for i in 0..100u64 {
                        q.put(QueueEntry::new((i % 3) as i32, p * 1000 + i, p)).unwrap();
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }

        let mut last = (i32::MIN, 0u64);
        for _ in 0..800 {
            let e = q.get().await;
            assert!((e.priority, e.sequence) > last);
            last = (e.priority, e.sequence);
            q.task_done().unwrap();
        }
        assert!(q.is_empty());
        timeout(Duration::from_secs(1), q.join()).await.unwrap();
    }
}
