// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Local backup flight data
//!
//! A small deterministic dataset used whenever the remote provider is
//! unavailable, unhealthy, or not configured. Answers from here carry
//! the fallback source tag so the assistant can caveat its replies.

use std::collections::HashMap;

use crate::flightdata::{DataSource, Endpoint, FlightLookup, FlightRecord, RouteQuery, RouteSearch};

/// An airport in the backup dataset
#[derive(Debug, Clone)]
pub struct Airport {
    pub name: &'static str,
    pub iata_code: &'static str,
    pub city: &'static str,
}

/// The local backup dataset
pub struct FallbackData {
    flights: Vec<FlightRecord>,
    airports: Vec<Airport>,
    city_to_iata: HashMap<&'static str, &'static str>,
}

impl Default for FallbackData {
    fn default() -> Self {
        Self::new()
    }
}

impl FallbackData {
    /// Build the backup dataset
    pub fn new() -> Self {
        Self {
            flights: sample_flights(),
            airports: sample_airports(),
            city_to_iata: city_to_iata_map(),
        }
    }

    /// Look up a flight by number, case-insensitive
    pub fn flight_status(&self, flight_number: &str) -> FlightLookup {
        let needle = flight_number.to_uppercase();
        let flight = self
            .flights
            .iter()
            .find(|f| f.flight_number.to_uppercase() == needle)
            .cloned();

        FlightLookup {
            flight,
            source: DataSource::Fallback,
        }
    }

    /// Search flights matching the route. Origin and destination can be
    /// city names or IATA codes.
    pub fn search_routes(&self, query: &RouteQuery) -> RouteSearch {
        let flights = self
            .flights
            .iter()
            .filter(|f| {
                endpoint_matches(&f.departure, &query.origin)
                    && endpoint_matches(&f.arrival, &query.destination)
            })
            .cloned()
            .collect();

        RouteSearch {
            flights,
            source: DataSource::Fallback,
        }
    }

    /// Resolve user input into an IATA code.
    ///
    /// Checks, in order: already a 3-letter code, the city map, the
    /// backup airport list, then uppercases the input as a last resort.
    pub fn airport_code(&self, city_or_code: &str) -> String {
        let trimmed = city_or_code.trim();
        if trimmed.is_empty() {
            return "N/A".to_string();
        }

        if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_uppercase()) {
            return trimmed.to_string();
        }

        let lower = trimmed.to_lowercase();
        if let Some(code) = self.city_to_iata.get(lower.as_str()) {
            return (*code).to_string();
        }

        for airport in &self.airports {
            if airport.city.to_lowercase().contains(&lower) {
                return airport.iata_code.to_string();
            }
        }

        trimmed.to_uppercase()
    }

    /// Map an IATA code back to its city, if known
    pub fn city_for_airport(&self, iata_code: &str) -> Option<&'static str> {
        self.airports
            .iter()
            .find(|a| a.iata_code == iata_code)
            .map(|a| a.city)
    }

    /// Cities served by the backup dataset
    pub fn popular_destinations(&self) -> Vec<&'static str> {
        self.airports.iter().map(|a| a.city).collect()
    }
}

fn endpoint_matches(endpoint: &Endpoint, city_or_code: &str) -> bool {
    let input = city_or_code.trim();
    if input.is_empty() {
        return false;
    }
    endpoint.city.to_lowercase().contains(&input.to_lowercase())
        || endpoint.airport == input.to_uppercase()
}

fn sample_flights() -> Vec<FlightRecord> {
    vec![
        FlightRecord {
            flight_number: "AA123".to_string(),
            airline: "American Airlines".to_string(),
            departure: Endpoint {
                airport: "JFK".to_string(),
                city: "New York".to_string(),
                time: "08:00".to_string(),
            },
            arrival: Endpoint {
                airport: "LAX".to_string(),
                city: "Los Angeles".to_string(),
                time: "11:30".to_string(),
            },
            status: "On Time".to_string(),
            aircraft: "Boeing 737-800".to_string(),
        },
        FlightRecord {
            flight_number: "UA456".to_string(),
            airline: "United Airlines".to_string(),
            departure: Endpoint {
                airport: "ORD".to_string(),
                city: "Chicago".to_string(),
                time: "14:20".to_string(),
            },
            arrival: Endpoint {
                airport: "ATL".to_string(),
                city: "Atlanta".to_string(),
                time: "17:45".to_string(),
            },
            status: "Delayed".to_string(),
            aircraft: "Airbus A320".to_string(),
        },
        FlightRecord {
            flight_number: "DL789".to_string(),
            airline: "Delta Air Lines".to_string(),
            departure: Endpoint {
                airport: "ATL".to_string(),
                city: "Atlanta".to_string(),
                time: "09:15".to_string(),
            },
            arrival: Endpoint {
                airport: "JFK".to_string(),
                city: "New York".to_string(),
                time: "12:30".to_string(),
            },
            status: "On Time".to_string(),
            aircraft: "Boeing 757-200".to_string(),
        },
    ]
}

fn sample_airports() -> Vec<Airport> {
    vec![
        Airport {
            name: "John F. Kennedy International",
            iata_code: "JFK",
            city: "New York",
        },
        Airport {
            name: "Los Angeles International",
            iata_code: "LAX",
            city: "Los Angeles",
        },
        Airport {
            name: "Chicago O'Hare International",
            iata_code: "ORD",
            city: "Chicago",
        },
        Airport {
            name: "Hartsfield-Jackson Atlanta International",
            iata_code: "ATL",
            city: "Atlanta",
        },
        Airport {
            name: "Dallas/Fort Worth International",
            iata_code: "DFW",
            city: "Dallas",
        },
    ]
}

fn city_to_iata_map() -> HashMap<&'static str, &'static str> {
    HashMap::from([
        ("new york", "JFK"),
        ("los angeles", "LAX"),
        ("chicago", "ORD"),
        ("atlanta", "ATL"),
        ("dallas", "DFW"),
        ("london", "LHR"),
        ("manchester", "MAN"),
        ("edinburgh", "EDI"),
        ("birmingham", "BHX"),
        ("glasgow", "GLA"),
        ("paris", "CDG"),
        ("nice", "NCE"),
        ("lyon", "LYS"),
        ("marseille", "MRS"),
        ("frankfurt", "FRA"),
        ("munich", "MUC"),
        ("berlin", "BER"),
        ("hamburg", "HAM"),
        ("dusseldorf", "DUS"),
        ("amsterdam", "AMS"),
        ("madrid", "MAD"),
        ("barcelona", "BCN"),
        ("rome", "FCO"),
        ("milan", "MXP"),
        ("venice", "VCE"),
        ("zurich", "ZRH"),
        ("geneva", "GVA"),
        ("moscow", "SVO"),
        ("st petersburg", "LED"),
        ("beijing", "PEK"),
        ("shanghai", "PVG"),
        ("guangzhou", "CAN"),
        ("shenzhen", "SZX"),
        ("chengdu", "CTU"),
        ("hong kong", "HKG"),
        ("tokyo", "HND"),
        ("osaka", "KIX"),
        ("nagoya", "NGO"),
        ("seoul", "ICN"),
        ("singapore", "SIN"),
        ("dubai", "DXB"),
        ("abu dhabi", "AUH"),
        ("doha", "DOH"),
        ("istanbul", "IST"),
        ("delhi", "DEL"),
        ("mumbai", "BOM"),
        ("bangalore", "BLR"),
        ("chennai", "MAA"),
        ("hyderabad", "HYD"),
        ("kolkata", "CCU"),
        ("sydney", "SYD"),
        ("melbourne", "MEL"),
        ("brisbane", "BNE"),
        ("perth", "PER"),
        ("sao paulo", "GRU"),
        ("rio de janeiro", "GIG"),
        ("toronto", "YYZ"),
        ("vancouver", "YVR"),
        ("montreal", "YUL"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flight_status_known_flight() {
        let data = FallbackData::new();
        let lookup = data.flight_status("AA123");

        let flight = lookup.flight.unwrap();
        assert_eq!(flight.airline, "American Airlines");
        assert_eq!(flight.departure.airport, "JFK");
        assert_eq!(lookup.source, DataSource::Fallback);
    }

    #[test]
    fn test_flight_status_case_insensitive() {
        let data = FallbackData::new();
        let lookup = data.flight_status("ua456");
        assert_eq!(lookup.flight.unwrap().status, "Delayed");
    }

    #[test]
    fn test_flight_status_not_found_is_a_value() {
        let data = FallbackData::new();
        let lookup = data.flight_status("ZZ999");
        assert!(lookup.flight.is_none());
        assert_eq!(lookup.source, DataSource::Fallback);
    }

    #[test]
    fn test_search_routes_by_city() {
        let data = FallbackData::new();
        let result = data.search_routes(&RouteQuery {
            origin: "New York".to_string(),
            destination: "Los Angeles".to_string(),
            date: None,
        });

        assert_eq!(result.flights.len(), 1);
        assert_eq!(result.flights[0].flight_number, "AA123");
    }

    #[test]
    fn test_search_routes_by_iata() {
        let data = FallbackData::new();
        let result = data.search_routes(&RouteQuery {
            origin: "atl".to_string(),
            destination: "jfk".to_string(),
            date: None,
        });

        assert_eq!(result.flights.len(), 1);
        assert_eq!(result.flights[0].flight_number, "DL789");
    }

    #[test]
    fn test_search_routes_no_match() {
        let data = FallbackData::new();
        let result = data.search_routes(&RouteQuery {
            origin: "Tokyo".to_string(),
            destination: "Sydney".to_string(),
            date: None,
        });

        assert!(result.flights.is_empty());
        assert_eq!(result.source, DataSource::Fallback);
    }

    #[test]
    fn test_airport_code_resolution_order() {
        let data = FallbackData::new();

        // Already a code
        assert_eq!(data.airport_code("JFK"), "JFK");
        // City map
        assert_eq!(data.airport_code("tokyo"), "HND");
        // Backup airport list substring
        assert_eq!(data.airport_code("Angeles"), "LAX");
        // Last resort: uppercase
        assert_eq!(data.airport_code("xyzzy"), "XYZZY");
    }

    #[test]
    fn test_airport_code_empty_input() {
        let data = FallbackData::new();
        assert_eq!(data.airport_code(""), "N/A");
    }

    #[test]
    fn test_city_for_airport() {
        let data = FallbackData::new();
        assert_eq!(data.city_for_airport("ORD"), Some("Chicago"));
        assert_eq!(data.city_for_airport("ZRH"), None);
    }

    #[test]
    fn test_popular_destinations() {
        let data = FallbackData::new();
        let cities = data.popular_destinations();
        assert!(cities.contains(&"New York"));
        assert_eq!(cities.len(), 5);
    }
}
