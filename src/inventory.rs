// Flight Inventory Source adapters
// The engine only ever asks for the complete current flight list.

use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::{
    coordinator::{RebuildReason, RebuildTrigger},
    error::InventoryError,
    flight::Flight,
};

#[async_trait]
pub trait FlightInventory: Send + Sync + 'static {
    async fn load_flights(&self) -> Result<Vec<Flight>, InventoryError>;
}

/// Process-local inventory owned by the booking side. Every mutation signals
/// the attached rebuild trigger.
#[derive(Default)]
pub struct InMemoryInventory {
    flights: RwLock<Vec<Flight>>,
    trigger: RwLock<Option<RebuildTrigger>>,
}

impl InMemoryInventory {
    pub fn new(flights: Vec<Flight>) -> Self {
        Self {
            flights: RwLock::new(flights),
            trigger: RwLock::new(None),
        }
    }

    pub fn attach_trigger(&self, trigger: RebuildTrigger) {
        *self.trigger.write() = Some(trigger);
    }

    pub fn replace_all(&self, flights: Vec<Flight>) {
        *self.flights.write() = flights;
        self.changed();
    }

    // Create or update by id
    pub fn upsert(&self, flight: Flight) {
        {
            let mut flights = self.flights.write();
            match flights.iter_mut().find(|f| f.id == flight.id) {
                Some(existing) => *existing = flight,
                None => flights.push(flight),
            }
        }
        self.changed();
    }

    pub fn remove(&self, flight_id: &str) -> bool {
        let removed = {
            let mut flights = self.flights.write();
            let before = flights.len();
            flights.retain(|f| f.id != flight_id);
            flights.len() != before
        };

        if removed {
            self.changed();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.flights.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.read().is_empty()
    }

    fn changed(&self) {
        if let Some(trigger) = self.trigger.read().as_ref() {
            let outcome = trigger.request(RebuildReason::InventoryChanged);
            debug!(?outcome, "inventory changed");
        }
    }
}

#[async_trait]
impl FlightInventory for InMemoryInventory {
    async fn load_flights(&self) -> Result<Vec<Flight>, InventoryError> {
        Ok(self.flights.read().clone())
    }
}

/// Reads a JSON array of flights from disk on every load.
#[derive(Debug, Clone)]
pub struct JsonFileInventory {
    path: PathBuf,
}

impl JsonFileInventory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FlightInventory for JsonFileInventory {
    async fn load_flights(&self) -> Result<Vec<Flight>, InventoryError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let flights: Vec<Flight> = serde_json::from_str(&raw)?;
        debug!(path = %self.path.display(), count = flights.len(), "loaded inventory file");
        Ok(flights)
    }
}
