// ── Generic reactive entity collection ──
//
// Concurrent storage with O(1) lookups and push-based change
// notification via `watch` channels. The polling task writes while the
// command loop reads.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

/// A concurrent, reactive collection for a single entity type.
///
/// Uses `DashMap` for O(1) lookups and a `watch` channel for the
/// current snapshot. Every mutation rebuilds the snapshot, which is
/// ordered by key so listings are stable between refreshes.
pub(crate) struct EntityCollection<T: Send + Sync + 'static> {
    by_key: DashMap<String, Arc<T>>,
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<T: Send + Sync + 'static> EntityCollection<T> {
    pub(crate) fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            by_key: DashMap::new(),
            snapshot,
        }
    }

    /// Replace an existing entity in place. Returns `false` (and stores
    /// nothing) if the key is unknown.
    pub(crate) fn update(&self, key: &str, f: impl FnOnce(&T) -> T) -> bool {
        let updated = match self.by_key.get_mut(key) {
            Some(mut entry) => {
                let next = f(entry.value());
                *entry.value_mut() = Arc::new(next);
                true
            }
            None => false,
        };
        if updated {
            self.rebuild_snapshot();
        }
        updated
    }

    /// Upsert all incoming entities, then prune any existing keys not in
    /// the incoming set. Avoids the brief empty state `clear()` causes.
    pub(crate) fn upsert_and_prune(&self, items: Vec<(String, T)>) {
        let incoming: HashSet<String> = items.iter().map(|(k, _)| k.clone()).collect();
        for (key, entity) in items {
            self.by_key.insert(key, Arc::new(entity));
        }
        self.by_key.retain(|key, _| incoming.contains(key));
        self.rebuild_snapshot();
    }

    /// Look up an entity by its key.
    pub(crate) fn get(&self, key: &str) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }

    fn rebuild_snapshot(&self) {
        let mut entries: Vec<(String, Arc<T>)> = self
            .by_key
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let items = entries.into_iter().map(|(_, v)| v).collect();
        self.snapshot.send_replace(Arc::new(items));
    }
}
