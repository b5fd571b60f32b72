//! Per-node operation serialization.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type NodeKey = (String, String);

/// Async mutex per `(group, name)`.
///
/// Operations on the same node queue behind each other; different nodes
/// never contend. Entries are created lazily and pruned once no operation
/// holds or waits on them.
#[derive(Debug, Default)]
pub struct NodeLocks {
    locks: DashMap<NodeKey, Arc<Mutex<()>>>,
}

impl NodeLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `group`/`name`.
    pub async fn acquire(&self, group: &str, name: &str) -> OwnedMutexGuard<()> {
        // Clone out of the map so no shard lock is held across the await.
        let lock = self
            .locks
            .entry((group.to_owned(), name.to_owned()))
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    /// Locks two names of one group in a stable order.
    pub async fn acquire_pair(
        &self,
        group: &str,
        first: &str,
        second: &str,
    ) -> (OwnedMutexGuard<()>, Option<OwnedMutexGuard<()>>) {
        if first == second {
            return (self.acquire(group, first).await, None);
        }
        let (low, high) = if first < second {
            (first, second)
        } else {
            (second, first)
        };
        let low_guard = self.acquire(group, low).await;
        let high_guard = self.acquire(group, high).await;
        (low_guard, Some(high_guard))
    }

    /// Drops entries nobody holds.
    pub fn prune(&self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_node_is_serialized() {
        let locks = Arc::new(NodeLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let locks = Arc::clone(&locks);
            let inside = Arc::clone(&inside);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("rg", "web").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_nodes_do_not_block() {
        let locks = NodeLocks::new();
        let _a = locks.acquire("rg", "a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("rg", "b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn prune_keeps_held_entries() {
        let locks = NodeLocks::new();
        let held = locks.acquire("rg", "a").await;
        drop(locks.acquire("rg", "b").await);

        locks.prune();
        assert_eq!(locks.len(), 1);

        drop(held);
        locks.prune();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn pair_of_same_name_locks_once() {
        let locks = NodeLocks::new();
        let (_g, second) = locks.acquire_pair("rg", "a", "a").await;
        assert!(second.is_none());
    }
}
