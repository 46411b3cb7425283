// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Booking directory
//!
//! In-memory booking store seeded with demo records. Stands in for a
//! reservation system backend.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// A passenger booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: String,
    pub passenger_name: String,
    pub flight_number: String,
    pub departure: String,
    pub arrival: String,
    pub date: String,
    pub seat: String,
    pub status: String,
}

/// In-memory booking store
pub struct BookingDirectory {
    bookings: Mutex<HashMap<String, Booking>>,
}

impl Default for BookingDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingDirectory {
    /// Create a directory seeded with demo bookings
    pub fn new() -> Self {
        let mut bookings = HashMap::new();
        for booking in demo_bookings() {
            bookings.insert(booking.booking_id.clone(), booking);
        }
        Self {
            bookings: Mutex::new(bookings),
        }
    }

    /// Look up a booking by its ID, case-insensitive
    pub fn find(&self, booking_id: &str) -> Option<Booking> {
        let bookings = self.bookings.lock().unwrap();
        bookings.get(&booking_id.to_uppercase()).cloned()
    }

    /// Find all bookings matching a passenger name substring
    pub fn search_by_name(&self, passenger_name: &str) -> Vec<Booking> {
        let needle = passenger_name.to_lowercase();
        let bookings = self.bookings.lock().unwrap();
        let mut results: Vec<Booking> = bookings
            .values()
            .filter(|b| b.passenger_name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        results.sort_by(|a, b| a.booking_id.cmp(&b.booking_id));
        results
    }

    /// Create a new booking and return it
    pub fn create(
        &self,
        passenger_name: impl Into<String>,
        flight_number: impl Into<String>,
        departure: impl Into<String>,
        arrival: impl Into<String>,
        date: impl Into<String>,
        seat: impl Into<String>,
    ) -> Booking {
        let mut bookings = self.bookings.lock().unwrap();
        let booking = Booking {
            booking_id: format!("BK{:03}", bookings.len() + 1),
            passenger_name: passenger_name.into(),
            flight_number: flight_number.into(),
            departure: departure.into(),
            arrival: arrival.into(),
            date: date.into(),
            seat: seat.into(),
            status: "Confirmed".to_string(),
        };
        bookings.insert(booking.booking_id.clone(), booking.clone());
        booking
    }
}

fn demo_bookings() -> Vec<Booking> {
    vec![
        Booking {
            booking_id: "ABC123".to_string(),
            passenger_name: "John Smith".to_string(),
            flight_number: "AA123".to_string(),
            departure: "New York (JFK)".to_string(),
            arrival: "Los Angeles (LAX)".to_string(),
            date: "2024-09-15".to_string(),
            seat: "12A".to_string(),
            status: "Confirmed".to_string(),
        },
        Booking {
            booking_id: "DEF456".to_string(),
            passenger_name: "Jane Doe".to_string(),
            flight_number: "UA456".to_string(),
            departure: "Chicago (ORD)".to_string(),
            arrival: "Atlanta (ATL)".to_string(),
            date: "2024-09-16".to_string(),
            seat: "8B".to_string(),
            status: "Confirmed".to_string(),
        },
        Booking {
            booking_id: "GHI789".to_string(),
            passenger_name: "Bob Johnson".to_string(),
            flight_number: "DL789".to_string(),
            departure: "Atlanta (ATL)".to_string(),
            arrival: "New York (JFK)".to_string(),
            date: "2024-09-17".to_string(),
            seat: "15C".to_string(),
            status: "Pending".to_string(),
        },
    ]
}
