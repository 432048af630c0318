// Graph Builder: turns one full inventory read into an immutable flight graph

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
    error::EngineError,
    flight::{Flight, Location},
};

/// Immutable adjacency snapshot. A rebuild always produces a new graph; this
/// one is never patched after construction.
#[derive(Debug)]
pub struct FlightGraph {
    version: u64,
    // Every location is a key, including pure destinations with no outbound edge.
    adjacency: HashMap<Location, Vec<Arc<Flight>>>,
    flight_count: usize,
    excluded_count: usize,
    built_at: DateTime<Utc>,
}

impl FlightGraph {
    pub fn empty() -> Self {
        Self {
            version: 0,
            adjacency: HashMap::new(),
            flight_count: 0,
            excluded_count: 0,
            built_at: Utc::now(),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn location_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn flight_count(&self) -> usize {
        self.flight_count
    }

    pub fn excluded_count(&self) -> usize {
        self.excluded_count
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn contains_location(&self, location: &str) -> bool {
        self.adjacency.contains_key(location)
    }

    // Outbound edges, sorted by departure then id
    pub fn outbound(&self, location: &str) -> &[Arc<Flight>] {
        self.adjacency
            .get(location)
            .map(|edges| edges.as_slice())
            .unwrap_or(&[])
    }

    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.adjacency.keys()
    }

    pub fn flights(&self) -> impl Iterator<Item = &Arc<Flight>> {
        self.adjacency.values().flatten()
    }
}

pub struct GraphBuilder;

impl GraphBuilder {
    /// Build a graph from the complete inventory. Duplicate ids fail the whole
    /// build; unboardable flights are only left out.
    pub fn build(flights: Vec<Flight>, version: u64) -> Result<FlightGraph, EngineError> {
        let mut seen = HashSet::with_capacity(flights.len());
        let mut duplicates = BTreeSet::new();
        for flight in &flights {
            if !seen.insert(flight.id.as_str()) {
                duplicates.insert(flight.id.clone());
            }
        }

        if !duplicates.is_empty() {
            return Err(EngineError::DataIntegrity {
                duplicate_ids: duplicates.into_iter().collect(),
            });
        }

        let mut adjacency: HashMap<Location, Vec<Arc<Flight>>> = HashMap::new();
        let mut flight_count = 0;
        let mut excluded_count = 0;

        for flight in flights {
            if !flight.is_boardable() {
                debug!(
                    flight_id = %flight.id,
                    seats = flight.available_seats,
                    "excluding unboardable flight from graph"
                );
                excluded_count += 1;
                continue;
            }

            adjacency.entry(flight.destination.clone()).or_default();
            adjacency
                .entry(flight.source.clone())
                .or_default()
                .push(Arc::new(flight));
            flight_count += 1;
        }

        for edges in adjacency.values_mut() {
            edges.sort_by(|a, b| a.departure.cmp(&b.departure).then_with(|| a.id.cmp(&b.id)));
        }

        Ok(FlightGraph {
            version,
            adjacency,
            flight_count,
            excluded_count,
            built_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::fixtures::flight;

    fn inventory() -> Vec<Flight> {
        vec![
            flight("F3", "A", "C", (14, 0), (16, 0), 300.0, 2),
            flight("F1", "A", "B", (10, 0), (12, 0), 100.0, 5),
            flight("F2", "B", "C", (13, 0), (15, 0), 150.0, 3),
            flight("F4", "A", "D", (9, 0), (11, 0), 80.0, 0),
            flight("F5", "C", "C", (9, 0), (11, 0), 80.0, 4),
            flight("F6", "C", "E", (11, 0), (9, 0), 80.0, 4),
        ]
    }

    #[test]
    fn test_build_groups_and_sorts_edges() {
        let graph = GraphBuilder::build(inventory(), 7).unwrap();

        assert_eq!(graph.version(), 7);
        assert_eq!(graph.flight_count(), 3);
        assert_eq!(graph.excluded_count(), 3);
        assert_eq!(graph.location_count(), 3);

        let ids: Vec<&str> = graph.outbound("A").iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["F1", "F3"]);
        assert!(graph.outbound("C").is_empty());
        assert!(graph.outbound("Z").is_empty());
        assert!(!graph.contains_location("D"));
    }

    #[test]
    fn test_every_edge_endpoint_is_a_node() {
        let graph = GraphBuilder::build(inventory(), 1).unwrap();

        for edge in graph.flights() {
            assert!(graph.contains_location(&edge.source));
            assert!(graph.contains_location(&edge.destination));
            assert_ne!(edge.source, edge.destination);
        }
    }

    #[test]
    fn test_duplicate_ids_are_a_data_integrity_error() {
        let mut flights = inventory();
        flights.push(flight("F1", "X", "Y", (10, 0), (11, 0), 10.0, 1));
        // unboardable duplicates still count
        flights.push(flight("F4", "X", "Y", (10, 0), (11, 0), 10.0, 1));

        match GraphBuilder::build(flights, 2) {
            Err(EngineError::DataIntegrity { duplicate_ids }) => {
                assert_eq!(duplicate_ids, vec!["F1".to_string(), "F4".to_string()]);
            }
            other => panic!("expected data integrity error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_graph() {
        let graph = FlightGraph::empty();
        assert_eq!(graph.version(), 0);
        assert_eq!(graph.location_count(), 0);
        assert_eq!(graph.flights().count(), 0);
    }
}
