// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for Sky
//!
//! This module defines all error types used throughout the application.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for Sky operations
#[derive(Error, Debug)]
pub enum SkyError {
    /// API-related errors (language-model provider)
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// A turn was submitted while another is still streaming
    #[error("session {0} is busy with an active turn")]
    SessionBusy(Uuid),

    /// Message routed to a session that does not exist
    #[error("unknown session: {0}")]
    UnknownSession(Uuid),

    /// The active turn was cancelled by a pause signal
    #[error("turn cancelled")]
    TurnCancelled,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(String),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// API-specific error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Authentication failed (invalid API key)
    #[error("Authentication failed: invalid API key")]
    AuthenticationFailed,

    /// Rate limited by the API
    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u32),

    /// Network connectivity error
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid response from API
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// API returned an error
    #[error("API error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Timeout waiting for response
    #[error("Request timed out")]
    Timeout,

    /// Streaming error
    #[error("Streaming error: {0}")]
    StreamError(String),
}

/// Result type alias for Sky operations
pub type Result<T> = std::result::Result<T, SkyError>;

impl From<toml::de::Error> for SkyError {
    fn from(err: toml::de::Error) -> Self {
        SkyError::Toml(err.to_string())
    }
}

impl From<toml::ser::Error> for SkyError {
    fn from(err: toml::ser::Error) -> Self {
        SkyError::Toml(err.to_string())
    }
}
