//! Shared aggregation state: source token to the destinations seen from it.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;

/// Thread-safe map from a source token to every destination ever observed
/// from it.
///
/// Growth is monotonic: entries are created on first observation and never
/// removed. Upserts take the write lock and snapshots take the read lock, so
/// a snapshot can never see a token whose destination set is half built.
#[derive(Debug, Default)]
pub struct AggregationStore {
    sources: RwLock<HashMap<String, HashSet<String>>>,
}

impl AggregationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `destination` was observed from `source_token`.
    ///
    /// Creates the destination set on first sight of the token. Returns
    /// `true` if the pairing is new.
    pub fn upsert(&self, source_token: &str, destination: &str) -> bool {
        // Fast path: token and destination already known
        {
            let sources = self.sources.read();
            if let Some(destinations) = sources.get(source_token) {
                if destinations.contains(destination) {
                    return false;
                }
            }
        }

        // Slow path: insert under the write lock
        let mut sources = self.sources.write();
        match sources.get_mut(source_token) {
            Some(destinations) => destinations.insert(destination.to_string()),
            None => {
                let mut destinations = HashSet::new();
                destinations.insert(destination.to_string());
                sources.insert(source_token.to_string(), destinations);
                true
            }
        }
    }

    /// Visit every `(source_token, destination)` pair while holding the lock.
    ///
    /// The visitor sees one consistent point-in-time state. Keep it cheap:
    /// upserts are blocked until it returns.
    pub fn for_each_edge<F>(&self, mut f: F)
    where
        F: FnMut(&str, &str),
    {
        let sources = self.sources.read();
        for (token, destinations) in sources.iter() {
            for destination in destinations {
                f(token, destination);
            }
        }
    }

    /// Copy out every `(source_token, destination)` pair without removing
    /// anything.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        self.for_each_edge(|token, destination| {
            pairs.push((token.to_string(), destination.to_string()));
        });
        pairs
    }

    /// Destinations observed from a source token, if any.
    pub fn destinations(&self, source_token: &str) -> Option<HashSet<String>> {
        self.sources.read().get(source_token).cloned()
    }

    /// Number of distinct source tokens.
    pub fn source_count(&self) -> usize {
        self.sources.read().len()
    }

    /// Number of distinct source→destination pairings.
    pub fn edge_count(&self) -> usize {
        self.sources.read().values().map(HashSet::len).sum()
    }

    /// True when nothing has been observed yet.
    pub fn is_empty(&self) -> bool {
        self.sources.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn upsert_creates_set_on_first_observation() {
        let store = AggregationStore::new();
        assert!(store.is_empty());

        assert!(store.upsert("10.0.0.1:podA", "10.0.0.2"));

        assert_eq!(store.source_count(), 1);
        assert_eq!(store.destinations("10.0.0.1:podA"), Some(set(&["10.0.0.2"])));
    }

    #[test]
    fn duplicate_destinations_collapse() {
        let store = AggregationStore::new();

        assert!(store.upsert("s", "d1"));
        assert!(store.upsert("s", "d2"));
        assert!(!store.upsert("s", "d1"));

        assert_eq!(store.destinations("s"), Some(set(&["d1", "d2"])));
        assert_eq!(store.edge_count(), 2);
    }

    #[test]
    fn snapshot_does_not_drain() {
        let store = AggregationStore::new();
        store.upsert("a:b", "d1");
        store.upsert("c:d", "d2");

        let first = store.snapshot();
        let second = store.snapshot();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert_eq!(store.edge_count(), 2);
    }

    #[test]
    fn tokens_are_keys_verbatim() {
        let store = AggregationStore::new();
        store.upsert("", "d1");
        store.upsert(":", "d1");
        store.upsert("fe80::1:podA", "d1");

        assert_eq!(store.source_count(), 3);
    }

    #[test]
    fn unknown_token_has_no_destinations() {
        let store = AggregationStore::new();
        assert_eq!(store.destinations("missing"), None);
    }

    #[test]
    fn empty_store_snapshot_is_empty() {
        let store = AggregationStore::new();
        assert!(store.snapshot().is_empty());

        let mut visited = 0;
        store.for_each_edge(|_, _| visited += 1);
        assert_eq!(visited, 0);
    }

    #[test]
    fn concurrent_upserts_are_not_lost() {
        use std::thread;

        let store = Arc::new(AggregationStore::new());

        let mut handles = vec![];
        for t in 0..10 {
            let s = store.clone();
            handles.push(thread::spawn(move || {
                for i in 0..100 {
                    s.upsert(&format!("10.0.0.{}:pod{}", t, t), &format!("dest-{}", i));
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.source_count(), 10);
        assert_eq!(store.edge_count(), 1000);
    }

    #[test]
    fn concurrent_upserts_to_same_source_deduplicate() {
        use std::thread;

        let store = Arc::new(AggregationStore::new());

        let mut handles = vec![];
        for _ in 0..8 {
            let s = store.clone();
            handles.push(thread::spawn(move || {
                for i in 0..50 {
                    s.upsert("shared:pod", &format!("dest-{}", i));
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(store.source_count(), 1);
        assert_eq!(store.edge_count(), 50);
    }
}
