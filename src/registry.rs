//! registry.rs
//!
//! Live set of stream subscribers. Iteration works on a snapshot taken under
//! the lock, so registrations racing a broadcast never see a partial frame
//! and a slow subscriber never holds the registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::queue::{QueueClosed, SubscriberQueue};
use crate::types::Frame;

/// A registered subscriber: its id plus the queue it drains.
#[derive(Clone, Debug)]
pub struct SubscriberHandle {
    pub id: Uuid,
    pub queue: Arc<SubscriberQueue>,
}

/// Outcome of one broadcast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers the frame was appended to.
    pub delivered: usize,
    /// Subscribers that had to drop their oldest frame.
    pub evicted: usize,
    /// Subscribers removed because their queue was closed.
    pub removed: usize,
}

pub struct SubscriberRegistry {
    subscribers: Mutex<HashMap<Uuid, Arc<SubscriberQueue>>>,
    capacity: usize,
}

impl SubscriberRegistry {
    /// Every queue created by this registry holds at most `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    fn subscribers(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<SubscriberQueue>>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self) -> SubscriberHandle {
        let id = Uuid::new_v4();
        let queue = Arc::new(SubscriberQueue::new(self.capacity));
        self.subscribers().insert(id, Arc::clone(&queue));
        log::debug!("Subscriber {} registered", id);
        SubscriberHandle { id, queue }
    }

    /// Remove and close a subscriber. Returns false if it was already gone.
    pub fn unregister(&self, id: Uuid) -> bool {
        let removed = self.subscribers().remove(&id);
        match removed {
            Some(queue) => {
                queue.close();
                log::debug!("Subscriber {} unregistered", id);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.subscribers().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.subscribers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers().is_empty()
    }

    /// Apply `f` to a snapshot of the live set. Subscribers for which `f`
    /// fails are removed once the whole snapshot has been visited; their ids
    /// are returned.
    pub fn for_each_live<F>(&self, mut f: F) -> Vec<Uuid>
    where
        F: FnMut(Uuid, &SubscriberQueue) -> Result<(), QueueClosed>,
    {
        let snapshot: Vec<(Uuid, Arc<SubscriberQueue>)> = self
            .subscribers()
            .iter()
            .map(|(id, queue)| (*id, Arc::clone(queue)))
            .collect();

        let dead: Vec<Uuid> = snapshot
            .iter()
            .filter_map(|(id, queue)| f(*id, &**queue).err().map(|_| *id))
            .collect();

        if !dead.is_empty() {
            let mut subscribers = self.subscribers();
            for id in &dead {
                subscribers.remove(id);
            }
        }
        dead
    }

    /// Append `frame` to every live queue.
    pub fn broadcast(&self, frame: &Frame) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let dead = self.for_each_live(|_, queue| {
            if queue.push(frame.clone())? {
                report.evicted += 1;
            }
            report.delivered += 1;
            Ok(())
        });
        report.removed = dead.len();
        for id in &dead {
            log::debug!("Dropping dead subscriber {}", id);
        }
        report
    }
}
