// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Flight data facade
//!
//! Single entry point for flight lookups. Tries the remote provider
//! when it is configured and healthy, retries once on failure, and
//! otherwise answers from the local backup dataset. Lookups never
//! error; every answer carries its source tag.

use crate::config::FlightDataConfig;
use crate::flightdata::fallback::FallbackData;
use crate::flightdata::health::ProviderHealth;
use crate::flightdata::remote::{RemoteClient, RemoteError};
use crate::flightdata::{DataSource, FlightLookup, FlightRecord, RouteQuery, RouteSearch};

/// Facade over remote and fallback flight data
pub struct FlightDataFacade {
    remote: Option<RemoteClient>,
    fallback: FallbackData,
    health: ProviderHealth,
}

impl FlightDataFacade {
    /// Create a facade. Without an API key all answers come from the
    /// backup dataset.
    pub fn new(api_key: Option<String>, config: &FlightDataConfig) -> Self {
        let remote = api_key
            .map(|key| RemoteClient::new(key, config.base_url.clone(), config.timeout_secs));

        if remote.is_none() {
            tracing::info!("no flight data API key configured, using backup data only");
        }

        Self {
            remote,
            fallback: FallbackData::new(),
            health: ProviderHealth::new(config.max_failures, config.cooldown_secs),
        }
    }

    /// A facade with no remote, for tests and offline use
    pub fn fallback_only() -> Self {
        Self::new(None, &FlightDataConfig::default())
    }

    /// Look up a single flight by number
    pub async fn flight_status(&self, flight_number: &str) -> FlightLookup {
        if let Some(remote) = self.remote_if_healthy() {
            match self
                .with_retry(|| remote.flight_status(flight_number))
                .await
            {
                Ok(records) => {
                    self.health.record_success();
                    if let Some(record) = records.into_iter().next() {
                        return FlightLookup {
                            flight: Some(self.refine_cities(record)),
                            source: DataSource::Remote,
                        };
                    }
                    // Remote had no match; the backup dataset may still
                }
                Err(e) => {
                    tracing::warn!(error = %e, flight_number, "remote flight lookup failed");
                    self.health.record_failure();
                }
            }
        }

        self.fallback.flight_status(flight_number)
    }

    /// Search flights for a route
    pub async fn search_routes(&self, query: &RouteQuery) -> RouteSearch {
        let dep = self.fallback.airport_code(&query.origin);
        let arr = self.fallback.airport_code(&query.destination);

        if let Some(remote) = self.remote_if_healthy() {
            match self
                .with_retry(|| remote.search_routes(&dep, &arr, query.date))
                .await
            {
                Ok(records) if !records.is_empty() => {
                    self.health.record_success();
                    return RouteSearch {
                        flights: records
                            .into_iter()
                            .map(|r| self.refine_cities(r))
                            .collect(),
                        source: DataSource::Remote,
                    };
                }
                Ok(_) => {
                    self.health.record_success();
                }
                Err(e) => {
                    tracing::warn!(error = %e, %dep, %arr, "remote route search failed");
                    self.health.record_failure();
                }
            }
        }

        self.fallback.search_routes(query)
    }

    /// Resolve user input to an IATA code
    pub fn airport_code(&self, city_or_code: &str) -> String {
        self.fallback.airport_code(city_or_code)
    }

    fn remote_if_healthy(&self) -> Option<&RemoteClient> {
        let remote = self.remote.as_ref()?;
        if self.health.allow_request() {
            Some(remote)
        } else {
            tracing::debug!("flight data remote on cooldown, using backup data");
            None
        }
    }

    /// One immediate retry on failure; one health strike per cycle
    async fn with_retry<F, Fut>(&self, attempt: F) -> Result<Vec<FlightRecord>, RemoteError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<Vec<FlightRecord>, RemoteError>>,
    {
        match attempt().await {
            Ok(records) => Ok(records),
            Err(first) => {
                tracing::debug!(error = %first, "remote attempt failed, retrying once");
                attempt().await
            }
        }
    }

    /// Replace code-for-city placeholders with known city names
    fn refine_cities(&self, mut record: FlightRecord) -> FlightRecord {
        if let Some(city) = self.fallback.city_for_airport(&record.departure.airport) {
            record.departure.city = city.to_string();
        }
        if let Some(city) = self.fallback.city_for_airport(&record.arrival.airport) {
            record.arrival.city = city.to_string();
        }
        record
    }
}
