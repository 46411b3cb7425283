// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Flight data module for Sky
//!
//! Provides grounded flight data from a remote provider with a
//! deterministic local fallback behind a single facade.

pub mod facade;
pub mod fallback;
pub mod health;
pub mod remote;

pub use facade::FlightDataFacade;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One end of a flight (departure or arrival)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// IATA airport code
    pub airport: String,
    /// City name
    pub city: String,
    /// Scheduled local time, HH:MM
    pub time: String,
}

/// A normalized flight record, identical in shape regardless of source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRecord {
    /// Flight number, e.g. "AA123"
    pub flight_number: String,
    /// Operating airline name
    pub airline: String,
    /// Departure endpoint
    pub departure: Endpoint,
    /// Arrival endpoint
    pub arrival: Endpoint,
    /// Human-readable status, e.g. "On Time"
    pub status: String,
    /// Aircraft type or registration
    pub aircraft: String,
}

/// Where a payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Live remote provider
    Remote,
    /// Local backup dataset
    Fallback,
}

/// Result of a single-flight status lookup. A missing flight is a
/// well-formed answer, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightLookup {
    /// The flight, if one matched
    pub flight: Option<FlightRecord>,
    /// Which source produced this answer
    pub source: DataSource,
}

/// A route search query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteQuery {
    /// Origin city or IATA code
    pub origin: String,
    /// Destination city or IATA code
    pub destination: String,
    /// Optional travel date, forwarded to the remote provider. The
    /// backup dataset is undated and ignores it.
    pub date: Option<NaiveDate>,
}

/// Result of a route search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSearch {
    /// Matching flights (possibly empty)
    pub flights: Vec<FlightRecord>,
    /// Which source produced this answer
    pub source: DataSource,
}

impl FlightLookup {
    /// An answer with no matching flight
    pub fn not_found(source: DataSource) -> Self {
        Self {
            flight: None,
            source,
        }
    }
}
