// Flight route computation engine: graph snapshots, bounded route search,
// a version-tagged route cache and the rebuild coordinator that keeps them current.

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod flight;
pub mod graph;
pub mod inventory;
pub mod route_cache;
pub mod route_computer;
pub mod warm;

// Re-export key types for convenience
pub use config::EngineConfig;
pub use coordinator::{RebuildCoordinator, RebuildEvent, RebuildReason, RebuildSummary, RebuildTrigger};
pub use engine::{EngineSnapshot, RouteEngine};
pub use error::{EngineError, ErrorKind, InventoryError};
pub use flight::{Flight, Location};
pub use graph::{FlightGraph, GraphBuilder};
pub use inventory::{FlightInventory, InMemoryInventory, JsonFileInventory};
pub use route_cache::{CacheStats, RouteCache, RouteKey};
pub use route_computer::{find_routes, ComputedFlightEntry, SearchConstraints};
pub use warm::{CombinedWarmPairs, RecentlyQueriedPairs, StaticWarmPairs, WarmPairPolicy};
