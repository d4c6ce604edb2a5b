// ── Generic reactive entity collection ──
//
// Concurrent keyed storage with push-based change notification via
// `watch` channels. Writes that leave an entity unchanged publish
// nothing, so subscribers only wake on real changes.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

/// A concurrent, reactive collection for a single entity type.
///
/// Uses `DashMap` for O(1) concurrent lookups and `watch` channels for
/// push-based change notification. Every effective mutation bumps a
/// version counter and rebuilds the key-ordered snapshot.
pub(crate) struct EntityCollection<K, T>
where
    K: Ord + Hash + Clone + Send + Sync + 'static,
    T: Clone + PartialEq + Send + Sync + 'static,
{
    by_key: DashMap<K, Arc<T>>,

    /// Version counter, bumped on every effective mutation.
    version: watch::Sender<u64>,

    /// Full snapshot ordered by key, rebuilt on mutation.
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<K, T> EntityCollection<K, T>
where
    K: Ord + Hash + Clone + Send + Sync + 'static,
    T: Clone + PartialEq + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            by_key: DashMap::new(),
            version,
            snapshot,
        }
    }

    /// Insert or replace an entity. Returns `true` if the stored value
    /// changed (new key, or different contents).
    pub(crate) fn upsert(&self, key: K, entity: T) -> bool {
        let changed = match self.by_key.get(&key) {
            Some(existing) => **existing != entity,
            None => true,
        };
        if changed {
            self.by_key.insert(key, Arc::new(entity));
            self.publish();
        }
        changed
    }

    /// Apply `f` to a copy of the entity under `key` and store the result
    /// if it differs. The read-modify-write holds the shard lock, so
    /// concurrent updates of one key never lose writes.
    ///
    /// Returns `None` if the key is absent, otherwise whether anything
    /// changed.
    pub(crate) fn update(&self, key: &K, f: impl FnOnce(&mut T)) -> Option<bool> {
        let changed = {
            let mut slot = self.by_key.get_mut(key)?;
            let mut next = T::clone(&slot);
            f(&mut next);
            if next == **slot {
                false
            } else {
                *slot = Arc::new(next);
                true
            }
        };
        if changed {
            self.publish();
        }
        Some(changed)
    }

    /// Remove an entity by key. Returns the removed entity if it existed.
    pub(crate) fn remove(&self, key: &K) -> Option<Arc<T>> {
        let removed = self.by_key.remove(key).map(|(_, v)| v);
        if removed.is_some() {
            self.publish();
        }
        removed
    }

    pub(crate) fn get(&self, key: &K) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.by_key.contains_key(key)
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }

    #[cfg(test)]
    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Rebuild the ordered snapshot and bump the version. The map is read
    /// under the snapshot's write lock, so the last publisher always sees
    /// every write that published before it.
    fn publish(&self) {
        self.snapshot.send_modify(|snap| {
            let mut entries: Vec<(K, Arc<T>)> = self
                .by_key
                .iter()
                .map(|r| (r.key().clone(), Arc::clone(r.value())))
                .collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            *snap = Arc::new(entries.into_iter().map(|(_, v)| v).collect());
        });
        self.version.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn upsert_reports_changes_only() {
        let col: EntityCollection<u32, String> = EntityCollection::new();
        assert!(col.upsert(1, "a".into()));
        assert!(!col.upsert(1, "a".into()));
        assert_eq!(col.version(), 1);
        assert!(col.upsert(1, "b".into()));
        assert_eq!(col.version(), 2);
    }

    #[test]
    fn snapshot_is_key_ordered() {
        let col: EntityCollection<u32, &'static str> = EntityCollection::new();
        col.upsert(3, "c");
        col.upsert(1, "a");
        col.upsert(2, "b");
        let snap: Vec<&str> = col.snapshot().iter().map(|v| **v).collect();
        assert_eq!(snap, vec!["a", "b", "c"]);
    }

    #[test]
    fn update_missing_key_is_none() {
        let col: EntityCollection<u32, u32> = EntityCollection::new();
        assert_eq!(col.update(&1, |v| *v += 1), None);
        col.upsert(1, 1);
        assert_eq!(col.update(&1, |v| *v += 1), Some(true));
        assert_eq!(col.update(&1, |_| {}), Some(false));
        assert_eq!(*col.get(&1).unwrap(), 2);
    }

    #[test]
    fn concurrent_writers_never_leave_a_stale_snapshot() {
        for _ in 0..200 {
            let col: EntityCollection<u32, u32> = EntityCollection::new();
            std::thread::scope(|scope| {
                for t in 0..8u32 {
                    let col = &col;
                    scope.spawn(move || {
                        for i in 0..50 {
                            col.upsert(t * 1000 + i, i);
                        }
                    });
                }
            });
            assert_eq!(col.snapshot().len(), col.len());
        }
    }

    #[test]
    fn remove_publishes_and_clears() {
        let col: EntityCollection<u32, u32> = EntityCollection::new();
        col.upsert(1, 1);
        let rx = col.subscribe();
        assert_eq!(*col.remove(&1).unwrap(), 1);
        assert!(rx.has_changed().unwrap());
        assert_eq!(col.len(), 0);
        assert!(col.remove(&1).is_none());
    }
}
