// Flight inventory records as read from the inventory source

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub type Location = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub id: String,
    pub source: Location,
    pub destination: Location,
    pub departure: DateTime<Utc>,
    pub arrival: DateTime<Utc>,
    pub price: f64,
    pub available_seats: i64,
}

impl Flight {
    pub fn new(
        id: &str,
        source: &str,
        destination: &str,
        departure: DateTime<Utc>,
        arrival: DateTime<Utc>,
        price: f64,
        available_seats: i64,
    ) -> Self {
        Self {
            id: id.to_string(),
            source: source.to_string(),
            destination: destination.to_string(),
            departure,
            arrival,
            price,
            available_seats,
        }
    }

    pub fn duration(&self) -> Duration {
        self.arrival - self.departure
    }

    /// Whether the flight can become a graph edge: it has seats left, a
    /// positive duration and two distinct endpoints.
    pub fn is_boardable(&self) -> bool {
        self.available_seats > 0
            && self.arrival > self.departure
            && self.source != self.destination
    }
}
