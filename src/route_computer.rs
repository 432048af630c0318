// Route Computer: bounded depth-first enumeration of itineraries over one graph snapshot
// Pure function of (graph, source, destination, constraints); safe to run in parallel.

use std::{cmp::Ordering, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::EngineError, flight::Flight, graph::FlightGraph};

// Hard ceiling on legs per itinerary regardless of configuration
pub const MAX_HOPS_LIMIT: u32 = 6;
// One week
pub const MAX_CONNECTION_MINUTES_LIMIT: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConstraints {
    /// Maximum number of legs in one itinerary (2 = direct or one connection).
    /// Counts legs, not connections, so 0 is rejected as a constraint violation.
    pub max_hops: u32,
    pub min_connection_minutes: i64,
    pub max_connection_minutes: i64,
    pub departure_not_before: Option<DateTime<Utc>>,
    /// Seats every leg must still offer.
    pub min_seats: i64,
    pub max_results: Option<usize>,
}

impl Default for SearchConstraints {
    fn default() -> Self {
        Self {
            max_hops: 2,
            min_connection_minutes: 30,
            max_connection_minutes: 720,
            departure_not_before: None,
            min_seats: 1,
            max_results: None,
        }
    }
}

impl SearchConstraints {
    pub fn validate(&self, max_hops_limit: u32) -> Result<(), EngineError> {
        let limit = max_hops_limit.min(MAX_HOPS_LIMIT);

        if self.max_hops == 0 {
            return Err(violation("max_hops must be at least 1"));
        }
        if self.max_hops > limit {
            return Err(violation(format!(
                "max_hops {} exceeds the limit of {}",
                self.max_hops, limit
            )));
        }
        if self.min_connection_minutes < 0 {
            return Err(violation("min_connection_minutes must not be negative"));
        }
        if self.min_connection_minutes > self.max_connection_minutes {
            return Err(violation(format!(
                "min_connection_minutes {} is greater than max_connection_minutes {}",
                self.min_connection_minutes, self.max_connection_minutes
            )));
        }
        if self.max_connection_minutes > MAX_CONNECTION_MINUTES_LIMIT {
            return Err(violation(format!(
                "max_connection_minutes must not exceed {}",
                MAX_CONNECTION_MINUTES_LIMIT
            )));
        }
        if self.min_seats < 1 {
            return Err(violation("min_seats must be at least 1"));
        }
        if self.max_results == Some(0) {
            return Err(violation("max_results must be at least 1 when set"));
        }

        Ok(())
    }
}

fn violation(message: impl Into<String>) -> EngineError {
    EngineError::ConstraintViolation(message.into())
}

/// One itinerary: the legs in travel order plus aggregates derived from them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedFlightEntry {
    pub id: String,
    pub legs: Vec<Arc<Flight>>,
    pub total_price: f64,
    pub total_duration_minutes: i64,
    pub available_seats: i64,
    pub number_of_hops: usize,
    pub first_departure: DateTime<Utc>,
    pub final_arrival: DateTime<Utc>,
}

impl ComputedFlightEntry {
    pub(crate) fn from_legs(legs: Vec<Arc<Flight>>) -> Option<Self> {
        let first = legs.first()?;
        let last = legs.last()?;

        let first_departure = first.departure;
        let final_arrival = last.arrival;
        let available_seats = legs.iter().map(|f| f.available_seats).min()?;
        let id = legs
            .iter()
            .map(|f| f.id.as_str())
            .collect::<Vec<_>>()
            .join(">");

        Some(Self {
            id,
            total_price: legs.iter().map(|f| f.price).sum(),
            total_duration_minutes: (final_arrival - first_departure).num_minutes(),
            available_seats,
            number_of_hops: legs.len() - 1,
            first_departure,
            final_arrival,
            legs,
        })
    }

    pub fn source(&self) -> &str {
        self.legs.first().map(|f| f.source.as_str()).unwrap_or_default()
    }

    pub fn destination(&self) -> &str {
        self.legs
            .last()
            .map(|f| f.destination.as_str())
            .unwrap_or_default()
    }
}

// Price, then duration, then hops; the id makes the order total.
pub fn rank_order(a: &ComputedFlightEntry, b: &ComputedFlightEntry) -> Ordering {
    a.total_price
        .total_cmp(&b.total_price)
        .then(a.total_duration_minutes.cmp(&b.total_duration_minutes))
        .then(a.number_of_hops.cmp(&b.number_of_hops))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn find_routes(
    graph: &FlightGraph,
    source: &str,
    destination: &str,
    constraints: &SearchConstraints,
) -> Result<Vec<ComputedFlightEntry>, EngineError> {
    constraints.validate(MAX_HOPS_LIMIT)?;
    if source.is_empty() || destination.is_empty() {
        return Err(violation("source and destination must not be empty"));
    }

    if source == destination
        || !graph.contains_location(source)
        || !graph.contains_location(destination)
    {
        return Ok(vec![]);
    }

    let mut search = PathSearch {
        graph,
        source,
        destination,
        constraints,
        path: Vec::with_capacity(constraints.max_hops as usize),
        found: vec![],
    };
    search.extend_from(source);

    let mut routes = search.found;
    routes.sort_by(rank_order);
    if let Some(limit) = constraints.max_results {
        routes.truncate(limit);
    }

    Ok(routes)
}

struct PathSearch<'g> {
    graph: &'g FlightGraph,
    source: &'g str,
    destination: &'g str,
    constraints: &'g SearchConstraints,
    path: Vec<&'g Arc<Flight>>,
    found: Vec<ComputedFlightEntry>,
}

impl<'g> PathSearch<'g> {
    fn extend_from(&mut self, location: &str) {
        for edge in self.candidate_edges(location) {
            if edge.available_seats < self.constraints.min_seats || self.visits(&edge.destination) {
                continue;
            }

            self.path.push(edge);
            if edge.destination == self.destination {
                let legs = self.path.iter().map(|&f| Arc::clone(f)).collect();
                if let Some(entry) = ComputedFlightEntry::from_legs(legs) {
                    self.found.push(entry);
                }
            } else if self.path.len() < self.constraints.max_hops as usize {
                self.extend_from(&edge.destination);
            }
            self.path.pop();
        }
    }

    // Adjacency lists are sorted by departure, so the connection window is a slice.
    fn candidate_edges(&self, location: &str) -> &'g [Arc<Flight>] {
        let edges = self.graph.outbound(location);

        match self.path.last() {
            None => {
                let start = match self.constraints.departure_not_before {
                    Some(not_before) => edges.partition_point(|f| f.departure < not_before),
                    None => 0,
                };
                &edges[start..]
            }
            Some(previous) => {
                let offset =
                    |minutes| previous.arrival.checked_add_signed(Duration::minutes(minutes));

                // Nothing departs past chrono's range: an out-of-range lower bound
                // leaves no candidates, an out-of-range upper bound leaves no cap.
                let Some(earliest) = offset(self.constraints.min_connection_minutes) else {
                    return &[];
                };
                let start = edges.partition_point(|f| f.departure < earliest);
                let end = match offset(self.constraints.max_connection_minutes) {
                    Some(latest) => edges.partition_point(|f| f.departure <= latest),
                    None => edges.len(),
                };
                &edges[start..end.max(start)]
            }
        }
    }

    fn visits(&self, location: &str) -> bool {
        self.source == location || self.path.iter().any(|f| f.destination == location)
    }
}
