//! queue.rs
//!
//! Bounded delivery queues. A full queue evicts its oldest item to make room,
//! so the producer never waits on a slow consumer.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::types::Frame;

/// Append to a queue whose consumer has gone away.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("subscriber queue is closed")]
pub struct QueueClosed;

/// Fixed-capacity FIFO that drops from the front on overflow.
#[derive(Debug, Clone)]
pub struct DropOldest<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> DropOldest<T> {
    /// `capacity` is raised to 1 if zero.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `item`, returning the evicted oldest item if the queue was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

#[derive(Debug)]
struct QueueState {
    frames: DropOldest<Frame>,
    closed: bool,
}

/// Frames waiting for one stream client.
#[derive(Debug)]
pub struct SubscriberQueue {
    state: Mutex<QueueState>,
}

impl SubscriberQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                frames: DropOldest::new(capacity),
                closed: false,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a frame. Returns whether an older frame was evicted.
    pub fn push(&self, frame: Frame) -> Result<bool, QueueClosed> {
        let mut state = self.state();
        if state.closed {
            return Err(QueueClosed);
        }
        Ok(state.frames.push(frame).is_some())
    }

    pub fn pop(&self) -> Option<Frame> {
        self.state().frames.pop()
    }

    /// Reject further appends and drop anything still queued.
    pub fn close(&self) {
        let mut state = self.state();
        state.closed = true;
        while state.frames.pop().is_some() {}
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    pub fn len(&self) -> usize {
        self.state().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.state().frames.capacity()
    }

    /// Copy of the queued frames, oldest first.
    pub fn snapshot(&self) -> Vec<Frame> {
        self.state().frames.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n: u32) -> Frame {
        Frame::Event(format!("data: {}\n\n", n))
    }

    #[test]
    fn test_drop_oldest_keeps_most_recent_in_order() {
        let mut queue = DropOldest::new(3);
        let evicted: Vec<_> = (1..=5).filter_map(|i| queue.push(i)).collect();

        assert_eq!(evicted, vec![1, 2]);
        assert_eq!(queue.iter().copied().collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(queue.pop(), Some(3));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut queue = DropOldest::new(0);
        assert_eq!(queue.capacity(), 1);
        assert_eq!(queue.push('a'), None);
        assert_eq!(queue.push('b'), Some('a'));
    }

    #[test]
    fn test_subscriber_queue_back_pressure() {
        let queue = SubscriberQueue::new(3);
        let evictions: Vec<bool> = (1..=5).map(|i| queue.push(frame(i)).unwrap()).collect();

        assert_eq!(evictions, vec![false, false, false, true, true]);
        assert_eq!(queue.snapshot(), vec![frame(3), frame(4), frame(5)]);
        assert_eq!(queue.pop(), Some(frame(3)));
        assert_eq!(queue.pop(), Some(frame(4)));
        assert_eq!(queue.pop(), Some(frame(5)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_closed_queue_rejects_appends() {
        let queue = SubscriberQueue::new(4);
        queue.push(frame(1)).unwrap();
        queue.close();

        assert!(queue.is_closed());
        assert!(queue.is_empty());
        assert_eq!(queue.push(frame(2)), Err(QueueClosed));
    }
}
