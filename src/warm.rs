// Warm-pair policies: which (source, destination) pairs a rebuild precomputes

use std::collections::{HashSet, VecDeque};

use parking_lot::Mutex;

use crate::route_cache::RouteKey;

pub trait WarmPairPolicy: Send + Sync + 'static {
    // Called on every successful query
    fn record_query(&self, _source: &str, _destination: &str) {}

    fn warm_pairs(&self) -> Vec<RouteKey>;
}

/// Fixed, pre-seeded list of popular pairs.
#[derive(Debug, Clone, Default)]
pub struct StaticWarmPairs {
    pairs: Vec<RouteKey>,
}

impl StaticWarmPairs {
    pub fn new(pairs: Vec<RouteKey>) -> Self {
        Self { pairs }
    }
}

impl WarmPairPolicy for StaticWarmPairs {
    fn warm_pairs(&self) -> Vec<RouteKey> {
        self.pairs.clone()
    }
}

/// The most recently queried distinct pairs, newest first.
#[derive(Debug)]
pub struct RecentlyQueriedPairs {
    capacity: usize,
    recent: Mutex<VecDeque<RouteKey>>,
}

impl RecentlyQueriedPairs {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            recent: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }
}

impl WarmPairPolicy for RecentlyQueriedPairs {
    fn record_query(&self, source: &str, destination: &str) {
        if self.capacity == 0 {
            return;
        }

        let key = RouteKey::new(source, destination);
        let mut recent = self.recent.lock();
        if let Some(pos) = recent.iter().position(|k| *k == key) {
            recent.remove(pos);
        }
        recent.push_front(key);
        recent.truncate(self.capacity);
    }

    fn warm_pairs(&self) -> Vec<RouteKey> {
        self.recent.lock().iter().cloned().collect()
    }
}

/// Seeded pairs first, then recently queried ones, without duplicates.
#[derive(Debug)]
pub struct CombinedWarmPairs {
    seeded: StaticWarmPairs,
    recent: RecentlyQueriedPairs,
}

impl CombinedWarmPairs {
    pub fn new(seeded: Vec<RouteKey>, recent_capacity: usize) -> Self {
        Self {
            seeded: StaticWarmPairs::new(seeded),
            recent: RecentlyQueriedPairs::new(recent_capacity),
        }
    }
}

impl WarmPairPolicy for CombinedWarmPairs {
    fn record_query(&self, source: &str, destination: &str) {
        self.recent.record_query(source, destination);
    }

    fn warm_pairs(&self) -> Vec<RouteKey> {
        let mut seen = HashSet::new();
        self.seeded
            .warm_pairs()
            .into_iter()
            .chain(self.recent.warm_pairs())
            .filter(|key| seen.insert(key.clone()))
            .collect()
    }
}
