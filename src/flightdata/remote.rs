// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Remote flight-data client (AviationStack)
//!
//! Thin typed client over the AviationStack flights endpoint. All
//! failures surface as RemoteError so the facade can decide when to
//! fall back; nothing here ever reaches the user directly.

use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::flightdata::{Endpoint, FlightRecord};

/// Errors from the remote provider
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Network-level failure
    #[error("network error: {0}")]
    Network(String),

    /// Request timed out
    #[error("request timed out")]
    Timeout,

    /// Non-success HTTP status
    #[error("HTTP status {0}")]
    Status(u16),

    /// The provider returned an in-band error object
    #[error("provider error: {0}")]
    Provider(String),

    /// Response body was not the expected shape
    #[error("malformed payload: {0}")]
    Payload(String),
}

/// Client for the AviationStack flights endpoint
pub struct RemoteClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl RemoteClient {
    /// Create a new remote client
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Look up flights by IATA flight number
    pub async fn flight_status(
        &self,
        flight_number: &str,
    ) -> Result<Vec<FlightRecord>, RemoteError> {
        self.fetch(&[
            ("flight_iata", flight_number.to_uppercase().as_str()),
            ("limit", "1"),
        ])
        .await
    }

    /// Search flights by departure and arrival IATA codes, optionally
    /// pinned to a travel date
    pub async fn search_routes(
        &self,
        dep_iata: &str,
        arr_iata: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<FlightRecord>, RemoteError> {
        let date_param = date.map(|d| d.format("%Y-%m-%d").to_string());
        let mut params = vec![
            ("dep_iata", dep_iata),
            ("arr_iata", arr_iata),
            ("limit", "10"),
        ];
        if let Some(ref date) = date_param {
            params.push(("flight_date", date.as_str()));
        }
        self.fetch(&params).await
    }

    async fn fetch(&self, params: &[(&str, &str)]) -> Result<Vec<FlightRecord>, RemoteError> {
        let mut query: Vec<(&str, &str)> = vec![("access_key", self.api_key.as_str())];
        query.extend_from_slice(params);

        tracing::debug!(?params, "querying flight data remote");

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RemoteError::Timeout
                } else {
                    RemoteError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }

        let body: AviationStackResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Payload(e.to_string()))?;

        if let Some(error) = body.error {
            return Err(RemoteError::Provider(error.info.unwrap_or_else(|| {
                error.code.unwrap_or_else(|| "unknown".to_string())
            })));
        }

        let data = body
            .data
            .ok_or_else(|| RemoteError::Payload("missing data array".to_string()))?;

        // Entries that don't parse are skipped rather than failing the batch
        Ok(data.into_iter().filter_map(format_flight).collect())
    }
}

/// Normalize one raw provider entry into a FlightRecord
fn format_flight(raw: AviationStackFlight) -> Option<FlightRecord> {
    let flight_number = raw.flight.as_ref()?.iata.clone()?;

    let airline = raw
        .airline
        .and_then(|a| a.name)
        .unwrap_or_else(|| "Unknown".to_string());

    let departure = format_endpoint(raw.departure);
    let arrival = format_endpoint(raw.arrival);

    let status = raw
        .flight_status
        .map(|s| title_case(&s.replace('_', " ")))
        .unwrap_or_else(|| "Unknown".to_string());

    let aircraft = raw
        .aircraft
        .and_then(|a| a.registration)
        .unwrap_or_else(|| "Unknown".to_string());

    Some(FlightRecord {
        flight_number,
        airline,
        departure,
        arrival,
        status,
        aircraft,
    })
}

fn format_endpoint(raw: Option<AviationStackEndpoint>) -> Endpoint {
    let raw = raw.unwrap_or_default();
    let airport = raw.iata.unwrap_or_else(|| "N/A".to_string());
    let time = raw
        .scheduled
        .as_deref()
        .and_then(format_time)
        .unwrap_or_else(|| "N/A".to_string());

    Endpoint {
        // City is refined by the facade from its airport map
        city: airport.clone(),
        airport,
        time,
    }
}

/// Extract HH:MM from an ISO-8601 timestamp
fn format_time(scheduled: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(scheduled)
        .ok()
        .map(|dt| dt.format("%H:%M").to_string())
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// AviationStack wire types

#[derive(Debug, Deserialize)]
struct AviationStackResponse {
    data: Option<Vec<AviationStackFlight>>,
    error: Option<AviationStackError>,
}

#[derive(Debug, Deserialize)]
struct AviationStackError {
    code: Option<String>,
    info: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AviationStackFlight {
    flight: Option<AviationStackFlightInfo>,
    airline: Option<AviationStackAirline>,
    departure: Option<AviationStackEndpoint>,
    arrival: Option<AviationStackEndpoint>,
    flight_status: Option<String>,
    aircraft: Option<AviationStackAircraft>,
}

#[derive(Debug, Deserialize)]
struct AviationStackFlightInfo {
    iata: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AviationStackAirline {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AviationStackEndpoint {
    iata: Option<String>,
    scheduled: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AviationStackAircraft {
    registration: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("on time"), "On Time");
        assert_eq!(title_case("active"), "Active");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_format_time() {
        assert_eq!(
            format_time("2024-09-15T08:00:00+00:00").as_deref(),
            Some("08:00")
        );
        assert_eq!(format_time("not a timestamp"), None);
    }

    #[test]
    fn test_format_flight_full_entry() {
        let raw: AviationStackFlight = serde_json::from_value(serde_json::json!({
            "flight": {"iata": "AA123"},
            "airline": {"name": "American Airlines"},
            "departure": {"iata": "JFK", "scheduled": "2024-09-15T08:00:00+00:00"},
            "arrival": {"iata": "LAX", "scheduled": "2024-09-15T11:30:00+00:00"},
            "flight_status": "on_time",
            "aircraft": {"registration": "N801AA"}
        }))
        .unwrap();

        let record = format_flight(raw).unwrap();
        assert_eq!(record.flight_number, "AA123");
        assert_eq!(record.airline, "American Airlines");
        assert_eq!(record.departure.airport, "JFK");
        assert_eq!(record.departure.time, "08:00");
        assert_eq!(record.status, "On Time");
        assert_eq!(record.aircraft, "N801AA");
    }

    #[test]
    fn test_format_flight_missing_number_skipped() {
        let raw: AviationStackFlight = serde_json::from_value(serde_json::json!({
            "airline": {"name": "Mystery Air"}
        }))
        .unwrap();

        assert!(format_flight(raw).is_none());
    }

    #[test]
    fn test_format_flight_sparse_entry_defaults() {
        let raw: AviationStackFlight = serde_json::from_value(serde_json::json!({
            "flight": {"iata": "XX1"}
        }))
        .unwrap();

        let record = format_flight(raw).unwrap();
        assert_eq!(record.airline, "Unknown");
        assert_eq!(record.departure.airport, "N/A");
        assert_eq!(record.departure.time, "N/A");
        assert_eq!(record.status, "Unknown");
    }
}
