// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Tools the model can call
//!
//! Tool calls form a closed set: anything the model requests is parsed
//! into the ToolCall enum before execution, and unknown names or bad
//! arguments become error replies fed back to the model rather than
//! crashes or silent guesses.

pub mod schema;

pub use schema::SchemaBuilder;

use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;

use crate::booking::BookingDirectory;
use crate::flightdata::{FlightDataFacade, RouteQuery};
use crate::llm::provider::ToolDefinition;

/// A validated tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    /// Look up live status for one flight
    FlightStatus { flight_number: String },

    /// Search flights between two places
    SearchRoutes {
        origin: String,
        destination: String,
        date: Option<NaiveDate>,
    },

    /// Look up a booking by its ID
    FindBooking { booking_id: String },
}

/// Why a tool request was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// The model asked for a tool that doesn't exist
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments were missing or malformed
    #[error("invalid arguments for {tool}: {reason}")]
    Validation { tool: String, reason: String },
}

/// Outcome of one tool invocation, paired with its request ID
#[derive(Debug, Clone)]
pub struct ToolReply {
    /// ID of the tool_use block this answers
    pub tool_use_id: String,
    /// JSON output, or a plain error description
    pub output: String,
    /// Whether the invocation failed
    pub is_error: bool,
}

impl ToolCall {
    /// Parse a raw model request into a validated call
    pub fn parse(name: &str, input: &serde_json::Value) -> Result<Self, ToolError> {
        match name {
            "get_flight_status" => {
                let flight_number = require_string(name, input, "flight_number")?;
                Ok(ToolCall::FlightStatus { flight_number })
            }
            "search_routes" => {
                let origin = require_string(name, input, "origin")?;
                let destination = require_string(name, input, "destination")?;
                let date = match input.get("date").and_then(|v| v.as_str()) {
                    Some(raw) if !raw.is_empty() => Some(
                        NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                            ToolError::Validation {
                                tool: name.to_string(),
                                reason: format!("date must be YYYY-MM-DD, got {:?}", raw),
                            }
                        })?,
                    ),
                    _ => None,
                };
                Ok(ToolCall::SearchRoutes {
                    origin,
                    destination,
                    date,
                })
            }
            "find_booking" => {
                let booking_id = require_string(name, input, "booking_id")?;
                Ok(ToolCall::FindBooking { booking_id })
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }

    /// The wire name of this tool
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::FlightStatus { .. } => "get_flight_status",
            ToolCall::SearchRoutes { .. } => "search_routes",
            ToolCall::FindBooking { .. } => "find_booking",
        }
    }
}

fn require_string(
    tool: &str,
    input: &serde_json::Value,
    field: &str,
) -> Result<String, ToolError> {
    match input.get(field).and_then(|v| v.as_str()) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(ToolError::Validation {
            tool: tool.to_string(),
            reason: format!("missing required field {:?}", field),
        }),
    }
}

/// Routes validated tool calls to their backends
pub struct ToolRouter {
    flights: Arc<FlightDataFacade>,
    bookings: Arc<BookingDirectory>,
}

impl ToolRouter {
    /// Create a router over the given backends
    pub fn new(flights: Arc<FlightDataFacade>, bookings: Arc<BookingDirectory>) -> Self {
        Self { flights, bookings }
    }

    /// Definitions advertised to the model
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: "get_flight_status".to_string(),
                description: "Look up the current status of a specific flight by flight number."
                    .to_string(),
                input_schema: SchemaBuilder::new()
                    .string("flight_number", "IATA flight number, e.g. AA123", true)
                    .build(),
            },
            ToolDefinition {
                name: "search_routes".to_string(),
                description:
                    "Search available flights between a departure and an arrival city or airport."
                        .to_string(),
                input_schema: SchemaBuilder::new()
                    .string("origin", "Departure city name or IATA code", true)
                    .string("destination", "Arrival city name or IATA code", true)
                    .string("date", "Optional travel date, YYYY-MM-DD", false)
                    .build(),
            },
            ToolDefinition {
                name: "find_booking".to_string(),
                description: "Look up an existing booking by its booking ID.".to_string(),
                input_schema: SchemaBuilder::new()
                    .string("booking_id", "Booking reference, e.g. ABC123", true)
                    .build(),
            },
        ]
    }

    /// Parse and execute one raw tool request, always producing a reply
    pub async fn dispatch(
        &self,
        tool_use_id: &str,
        name: &str,
        input: &serde_json::Value,
    ) -> ToolReply {
        let call = match ToolCall::parse(name, input) {
            Ok(call) => call,
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "rejected tool request");
                return ToolReply {
                    tool_use_id: tool_use_id.to_string(),
                    output: e.to_string(),
                    is_error: true,
                };
            }
        };

        tracing::info!(tool = call.name(), "executing tool");
        let output = self.execute(&call).await;

        ToolReply {
            tool_use_id: tool_use_id.to_string(),
            output,
            is_error: false,
        }
    }

    async fn execute(&self, call: &ToolCall) -> String {
        match call {
            ToolCall::FlightStatus { flight_number } => {
                let lookup = self.flights.flight_status(flight_number).await;
                serde_json::to_string(&lookup).unwrap_or_else(|_| "{}".to_string())
            }
            ToolCall::SearchRoutes {
                origin,
                destination,
                date,
            } => {
                let result = self
                    .flights
                    .search_routes(&RouteQuery {
                        origin: origin.clone(),
                        destination: destination.clone(),
                        date: *date,
                    })
                    .await;
                serde_json::to_string(&result).unwrap_or_else(|_| "{}".to_string())
            }
            ToolCall::FindBooking { booking_id } => match self.bookings.find(booking_id) {
                Some(booking) => {
                    serde_json::to_string(&booking).unwrap_or_else(|_| "{}".to_string())
                }
                None => serde_json::json!({
                    "found": false,
                    "booking_id": booking_id,
                })
                .to_string(),
            },
        }
    }
}
