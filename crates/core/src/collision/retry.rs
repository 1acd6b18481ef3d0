use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

use super::key::{ActorId, CollisionKey};

#[derive(Debug, Clone, Copy)]
pub struct ScheduledRetry {
    pub due: Instant,
    seq: u64,
    /// Participants in the order they were reported.
    pub first: ActorId,
    pub second: ActorId,
}

impl ScheduledRetry {
    pub fn key(&self) -> CollisionKey {
        CollisionKey::new(self.first, self.second)
    }
}

impl PartialEq for ScheduledRetry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for ScheduledRetry {}

impl PartialOrd for ScheduledRetry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledRetry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Single-shot deferred retries, fired in due order.
#[derive(Debug, Default)]
pub struct RetryQueue {
    heap: BinaryHeap<ScheduledRetry>,
    next_seq: u64,
}

impl RetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: Instant, first: ActorId, second: ActorId) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(ScheduledRetry {
            due,
            seq,
            first,
            second,
        });
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.heap.peek().map(|r| r.due)
    }

    pub fn pop_due(&mut self, now: Instant) -> Option<ScheduledRetry> {
        if self.heap.peek().is_some_and(|r| r.due <= now) {
            self.heap.pop()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn fires_in_due_order() {
        let start = Instant::now();
        let mut queue = RetryQueue::new();
        queue.schedule(start + Duration::from_millis(30), 5, 6);
        queue.schedule(start + Duration::from_millis(10), 1, 2);
        queue.schedule(start + Duration::from_millis(10), 3, 4);

        assert_eq!(queue.next_due(), Some(start + Duration::from_millis(10)));
        assert!(queue.pop_due(start).is_none());

        let later = start + Duration::from_millis(20);
        let a = queue.pop_due(later).unwrap();
        let b = queue.pop_due(later).unwrap();
        assert_eq!((a.first, b.first), (1, 3));
        assert!(queue.pop_due(later).is_none());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn keeps_report_order() {
        let start = Instant::now();
        let mut queue = RetryQueue::new();
        queue.schedule(start, 9, 4);

        let retry = queue.pop_due(start).unwrap();
        assert_eq!((retry.first, retry.second), (9, 4));
        assert_eq!(retry.key(), CollisionKey::new(4, 9));
        assert!(queue.is_empty());
    }
}
