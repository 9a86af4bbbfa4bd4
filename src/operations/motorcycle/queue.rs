use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::error::SkeletonError;

#[derive(Debug)]
struct Entry<T> {
    time: f64,
    seq: u64,
    event: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Min-ordered queue of timed events.
///
/// Events at the same time come out in insertion order.
#[derive(Debug)]
pub struct EventQueue<T> {
    heap: BinaryHeap<Reverse<Entry<T>>>,
    seq: u64,
}

impl<T> Default for EventQueue<T> {
    fn default() -> Self {
        Self {
            heap: BinaryHeap::new(),
            seq: 0,
        }
    }
}

impl<T> EventQueue<T> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Schedules `event` at `time`.
    ///
    /// # Errors
    ///
    /// Returns [`SkeletonError::InvalidTime`] for a NaN or infinite time.
    pub fn push(&mut self, time: f64, event: T) -> Result<(), SkeletonError> {
        if !time.is_finite() {
            return Err(SkeletonError::InvalidTime(time));
        }
        self.heap.push(Reverse(Entry {
            time,
            seq: self.seq,
            event,
        }));
        self.seq += 1;
        Ok(())
    }

    /// Time of the earliest event.
    #[must_use]
    pub fn peek_time(&self) -> Option<f64> {
        self.heap.peek().map(|Reverse(e)| e.time)
    }

    /// Removes the earliest event.
    pub fn pop(&mut self) -> Option<(f64, T)> {
        self.heap.pop().map(|Reverse(e)| (e.time, e.event))
    }

    /// Removes every event sharing the earliest time, in insertion order.
    pub fn pop_bucket(&mut self) -> Option<(f64, Vec<T>)> {
        let (time, first) = self.pop()?;
        let mut bucket = vec![first];
        while self.peek_time().is_some_and(|t| t.total_cmp(&time).is_eq()) {
            if let Some((_, event)) = self.pop() {
                bucket.push(event);
            }
        }
        Some((time, bucket))
    }
}
