/*!
 * Snapshot Publisher
 * Fan-out of state snapshots with per-subscriber latest-wins slots
 *
 * Each subscriber owns a bounded slot of exactly one pending snapshot; a
 * slow reader only loses intermediate states, never stalls the writer.
 * Disconnected subscribers are swept on the next publish.
 */

use crate::snapshot::StateSnapshot;
use dashmap::DashMap;
use log::debug;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Fan-out statistics
#[derive(Debug, Clone, Default)]
pub struct PublisherStats {
    pub published: u64,
    pub subscribers: usize,
}

struct Registry {
    slots: DashMap<u64, watch::Sender<Arc<StateSnapshot>>>,
    next_id: AtomicU64,
    published: AtomicU64,
    latest: RwLock<Arc<StateSnapshot>>,
}

/// Snapshot fan-out shared between the worker and subscriber handles
#[derive(Clone)]
pub struct Publisher {
    registry: Arc<Registry>,
}

impl Publisher {
    pub fn new(initial: Arc<StateSnapshot>) -> Self {
        Self {
            registry: Arc::new(Registry {
                slots: DashMap::new(),
                next_id: AtomicU64::new(0),
                published: AtomicU64::new(0),
                latest: RwLock::new(initial),
            }),
        }
    }

    /// Register a subscriber; it immediately observes the latest snapshot
    pub fn subscribe(&self) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let latest = self.registry.latest.read().clone();
        let (tx, rx) = watch::channel(latest);
        self.registry.slots.insert(id, tx);
        debug!("subscriber {id} registered");
        Subscription {
            id,
            rx,
            registry: Arc::clone(&self.registry),
        }
    }

    /// Deliver a snapshot to every live subscriber (latest-wins per slot)
    pub fn publish(&self, snapshot: Arc<StateSnapshot>) {
        *self.registry.latest.write() = Arc::clone(&snapshot);
        self.registry.published.fetch_add(1, Ordering::Relaxed);

        let mut disconnected = Vec::new();
        for entry in self.registry.slots.iter() {
            if entry.value().send(Arc::clone(&snapshot)).is_err() {
                disconnected.push(*entry.key());
            }
        }
        for id in disconnected {
            self.registry.slots.remove(&id);
            debug!("subscriber {id} disconnected, slot removed");
        }
    }

    /// Most recently published snapshot
    pub fn latest(&self) -> Arc<StateSnapshot> {
        self.registry.latest.read().clone()
    }

    pub fn stats(&self) -> PublisherStats {
        PublisherStats {
            published: self.registry.published.load(Ordering::Relaxed),
            subscribers: self.registry.slots.len(),
        }
    }
}

/// Subscriber handle; dropping it frees the fan-out slot
pub struct Subscription {
    id: u64,
    rx: watch::Receiver<Arc<StateSnapshot>>,
    registry: Arc<Registry>,
}

impl Subscription {
    /// Wait for the next snapshot after the last one seen.
    ///
    /// Returns `None` once the publisher side is gone.
    pub async fn next(&mut self) -> Option<Arc<StateSnapshot>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Latest snapshot in the slot without waiting
    pub fn current(&mut self) -> Arc<StateSnapshot> {
        self.rx.borrow_and_update().clone()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.slots.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sched::SchedConfig;

    fn snapshot(time: u64) -> Arc<StateSnapshot> {
        let mut s = StateSnapshot::default_state(&SchedConfig::default(), vec![]);
        s.time = time;
        Arc::new(s)
    }

    #[tokio::test]
    async fn test_subscriber_sees_latest() {
        let publisher = Publisher::new(snapshot(0));
        let mut sub = publisher.subscribe();

        publisher.publish(snapshot(1));
        let seen = sub.next().await.unwrap();
        assert_eq!(seen.time, 1);
    }

    #[tokio::test]
    async fn test_latest_wins_coalescing() {
        let publisher = Publisher::new(snapshot(0));
        let mut sub = publisher.subscribe();

        // Publish a burst without the subscriber draining
        for t in 1..=5 {
            publisher.publish(snapshot(t));
        }
        let seen = sub.next().await.unwrap();
        assert_eq!(seen.time, 5, "intermediate snapshots are dropped");
    }

    #[tokio::test]
    async fn test_drop_frees_slot() {
        let publisher = Publisher::new(snapshot(0));
        let sub = publisher.subscribe();
        assert_eq!(publisher.stats().subscribers, 1);
        drop(sub);
        assert_eq!(publisher.stats().subscribers, 0);
    }

    #[tokio::test]
    async fn test_independent_subscribers() {
        let publisher = Publisher::new(snapshot(0));
        let mut a = publisher.subscribe();
        let mut b = publisher.subscribe();

        publisher.publish(snapshot(7));
        assert_eq!(a.next().await.unwrap().time, 7);
        assert_eq!(b.next().await.unwrap().time, 7);
    }

    #[tokio::test]
    async fn test_new_subscriber_starts_at_latest() {
        let publisher = Publisher::new(snapshot(0));
        publisher.publish(snapshot(3));
        let mut sub = publisher.subscribe();
        assert_eq!(sub.current().time, 3);
    }
}
