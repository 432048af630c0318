// Current (graph, cache) snapshot and the route query path
// Readers clone the snapshot pointer once per query; the lock only guards that pointer.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::{
    config::EngineConfig,
    error::{ConfigError, EngineError},
    graph::FlightGraph,
    route_cache::{Itineraries, RouteCache},
    route_computer::{find_routes, SearchConstraints},
    warm::{CombinedWarmPairs, WarmPairPolicy},
};

#[derive(Debug)]
pub struct EngineSnapshot {
    pub graph: Arc<FlightGraph>,
    pub cache: Arc<RouteCache>,
}

impl EngineSnapshot {
    pub fn empty() -> Self {
        Self {
            graph: Arc::new(FlightGraph::empty()),
            cache: Arc::new(RouteCache::new(0)),
        }
    }

    pub fn version(&self) -> u64 {
        self.graph.version()
    }
}

pub struct RouteEngine {
    current: RwLock<Arc<EngineSnapshot>>,
    config: EngineConfig,
    default_constraints: SearchConstraints,
    warm_policy: Arc<dyn WarmPairPolicy>,
}

impl RouteEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        let policy = CombinedWarmPairs::new(config.warm.pairs.clone(), config.warm.recent_capacity);
        Self::with_warm_policy(config, Arc::new(policy))
    }

    pub fn with_warm_policy(
        config: EngineConfig,
        warm_policy: Arc<dyn WarmPairPolicy>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            current: RwLock::new(Arc::new(EngineSnapshot::empty())),
            default_constraints: config.search.constraints(),
            config,
            warm_policy,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn default_constraints(&self) -> &SearchConstraints {
        &self.default_constraints
    }

    pub fn warm_policy(&self) -> &Arc<dyn WarmPairPolicy> {
        &self.warm_policy
    }

    pub fn snapshot(&self) -> Arc<EngineSnapshot> {
        Arc::clone(&self.current.read())
    }

    pub fn graph_version(&self) -> u64 {
        self.current.read().version()
    }

    // Only the rebuild coordinator publishes. Returns the replaced snapshot.
    pub(crate) fn publish(&self, snapshot: EngineSnapshot) -> Arc<EngineSnapshot> {
        let next = Arc::new(snapshot);
        std::mem::replace(&mut *self.current.write(), next)
    }

    /// Ranked itineraries from `source` to `destination`. An empty result means
    /// no itinerary satisfies the constraints.
    ///
    /// Default constraints read through the route cache. Custom constraints are
    /// computed against the snapshot directly since the cache key carries no
    /// constraint component.
    pub fn search_routes(
        &self,
        source: &str,
        destination: &str,
        constraints: Option<SearchConstraints>,
    ) -> Result<Itineraries, EngineError> {
        let constraints = constraints.unwrap_or_else(|| self.default_constraints.clone());
        constraints.validate(self.config.max_hops_limit)?;
        let cacheable = constraints == self.default_constraints;

        let snapshot = self.snapshot();
        let version = snapshot.version();

        if cacheable {
            if let Some(routes) = snapshot.cache.get(source, destination, version) {
                debug!(source, destination, version, "route cache hit");
                self.warm_policy.record_query(source, destination);
                return Ok(routes);
            }
        }

        let routes = Arc::new(find_routes(&snapshot.graph, source, destination, &constraints)?);
        debug!(
            source,
            destination,
            version,
            count = routes.len(),
            "computed routes on demand"
        );

        if cacheable {
            snapshot
                .cache
                .put(source, destination, Arc::clone(&routes), version);
        }
        self.warm_policy.record_query(source, destination);

        Ok(routes)
    }
}
