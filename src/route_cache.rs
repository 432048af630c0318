// Route Cache: computed itineraries keyed by (source, destination)
// Every entry carries the graph version it was computed from; a version mismatch is a miss.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::route_computer::ComputedFlightEntry;

pub type Itineraries = Arc<Vec<ComputedFlightEntry>>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteKey {
    pub source: String,
    pub destination: String,
}

impl RouteKey {
    pub fn new(source: &str, destination: &str) -> Self {
        Self {
            source: source.to_string(),
            destination: destination.to_string(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub items_count: usize,
    pub hit_count: usize,
    pub miss_count: usize,
    pub stale_count: usize,
    pub rejected_count: usize,
    pub invalidation_count: usize,
    pub total_lookups: usize,
}

#[derive(Debug)]
struct CacheEntry {
    itineraries: Itineraries,
    graph_version: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
    stale_count: AtomicUsize,
    rejected_count: AtomicUsize,
    invalidation_count: AtomicUsize,
}

#[derive(Debug)]
pub struct RouteCache {
    store: DashMap<RouteKey, CacheEntry>,
    graph_version: u64,
    counters: Counters,
}

impl RouteCache {
    pub fn new(graph_version: u64) -> Self {
        Self {
            store: DashMap::new(),
            graph_version,
            counters: Counters::default(),
        }
    }

    pub fn graph_version(&self) -> u64 {
        self.graph_version
    }

    pub fn get(&self, source: &str, destination: &str, current_version: u64) -> Option<Itineraries> {
        let key = RouteKey::new(source, destination);

        let hit = match self.store.get(&key) {
            Some(entry) if entry.graph_version == current_version => {
                Some(Arc::clone(&entry.itineraries))
            }
            Some(_) => None,
            None => {
                self.counters.miss_count.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        match hit {
            Some(itineraries) => {
                self.counters.hit_count.fetch_add(1, Ordering::Relaxed);
                Some(itineraries)
            }
            None => {
                // Evict outside the read guard; a stale tag is treated as already gone.
                self.store
                    .remove_if(&key, |_, entry| entry.graph_version != current_version);
                self.counters.stale_count.fetch_add(1, Ordering::Relaxed);
                self.counters.miss_count.fetch_add(1, Ordering::Relaxed);
                debug!(source, destination, current_version, "stale route cache entry");
                None
            }
        }
    }

    /// Store itineraries computed against `graph_version`. Returns false when the
    /// version does not match the graph this cache is bound to.
    pub fn put(
        &self,
        source: &str,
        destination: &str,
        itineraries: Itineraries,
        graph_version: u64,
    ) -> bool {
        if graph_version != self.graph_version {
            self.counters.rejected_count.fetch_add(1, Ordering::Relaxed);
            warn!(
                source,
                destination,
                graph_version,
                cache_version = self.graph_version,
                "rejecting route cache put for foreign graph version"
            );
            return false;
        }

        self.store.insert(
            RouteKey::new(source, destination),
            CacheEntry {
                itineraries,
                graph_version,
            },
        );
        true
    }

    pub fn invalidate_all(&self) -> usize {
        let dropped = self.store.len();
        self.store.clear();
        self.counters
            .invalidation_count
            .fetch_add(dropped, Ordering::Relaxed);
        dropped
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn keys(&self) -> Vec<RouteKey> {
        let mut keys: Vec<RouteKey> = self.store.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn stats(&self) -> CacheStats {
        let hit_count = self.counters.hit_count.load(Ordering::Relaxed);
        let miss_count = self.counters.miss_count.load(Ordering::Relaxed);

        CacheStats {
            items_count: self.store.len(),
            hit_count,
            miss_count,
            stale_count: self.counters.stale_count.load(Ordering::Relaxed),
            rejected_count: self.counters.rejected_count.load(Ordering::Relaxed),
            invalidation_count: self.counters.invalidation_count.load(Ordering::Relaxed),
            total_lookups: hit_count + miss_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::fixtures::flight;
    use std::thread;

    fn itineraries(ids: &[&str]) -> Itineraries {
        Arc::new(
            ids.iter()
                .filter_map(|id| {
                    let leg = Arc::new(flight(id, "A", "B", (10, 0), (12, 0), 100.0, 5));
                    ComputedFlightEntry::from_legs(vec![leg])
                })
                .collect(),
        )
    }

    #[test]
    fn test_put_then_get_round_trip() {
        let cache = RouteCache::new(3);
        let routes = itineraries(&["F1", "F2"]);

        assert!(cache.put("A", "B", Arc::clone(&routes), 3));
        let cached = cache.get("A", "B", 3).unwrap();
        assert_eq!(cached, routes);
        assert!(Arc::ptr_eq(&cached, &routes));

        assert!(cache.get("B", "A", 3).is_none());

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.total_lookups, 2);
        assert_eq!(stats.items_count, 1);
    }

    #[test]
    fn test_version_mismatch_is_a_miss() {
        let cache = RouteCache::new(3);
        assert!(cache.put("A", "B", itineraries(&["F1"]), 3));

        assert!(cache.get("A", "B", 4).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.stats().stale_count, 1);
    }

    #[test]
    fn test_put_for_foreign_version_is_rejected() {
        let cache = RouteCache::new(3);
        assert!(!cache.put("A", "B", itineraries(&["F1"]), 2));
        assert!(cache.get("A", "B", 3).is_none());
        assert_eq!(cache.stats().rejected_count, 1);
    }

    #[test]
    fn test_invalidate_all() {
        let cache = RouteCache::new(1);
        cache.put("A", "B", itineraries(&["F1"]), 1);
        cache.put("A", "C", itineraries(&["F2"]), 1);
        assert_eq!(cache.keys(), vec![RouteKey::new("A", "B"), RouteKey::new("A", "C")]);

        assert_eq!(cache.invalidate_all(), 2);
        assert!(cache.get("A", "B", 1).is_none());
        assert!(cache.get("A", "C", 1).is_none());
        assert_eq!(cache.stats().invalidation_count, 2);
    }

    #[test]
    fn test_concurrent_puts_are_last_write_wins() {
        let cache = Arc::new(RouteCache::new(1));
        let routes = itineraries(&["F1", "F2"]);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let routes = Arc::clone(&routes);
                thread::spawn(move || {
                    for _ in 0..200 {
                        cache.put("A", "B", Arc::clone(&routes), 1);
                        let _ = cache.get("A", "B", 1);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("A", "B", 1).unwrap(), routes);
        assert_eq!(cache.stats().miss_count, 0);
    }
}
