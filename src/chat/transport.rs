// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Outbound wire frames
//!
//! What a session sends to its client: zero or more text fragments
//! followed by exactly one terminal marker per turn.

use serde::{Deserialize, Serialize};

/// How a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnStatus {
    /// Stream ran to natural completion
    Completed,
    /// Turn was cancelled by a pause signal
    Cancelled,
    /// Turn failed with an error
    Failed,
}

/// A frame sent to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// A piece of assistant text, in order
    Fragment { text: String },

    /// The single end-of-turn marker
    Terminal {
        status: TurnStatus,
        /// Short human-readable detail for cancelled/failed turns
        #[serde(skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
}

impl Outbound {
    /// A text fragment
    pub fn fragment(text: impl Into<String>) -> Self {
        Outbound::Fragment { text: text.into() }
    }

    /// Terminal marker for a completed turn
    pub fn completed() -> Self {
        Outbound::Terminal {
            status: TurnStatus::Completed,
            detail: None,
        }
    }

    /// Terminal marker for a cancelled turn
    pub fn cancelled() -> Self {
        Outbound::Terminal {
            status: TurnStatus::Cancelled,
            detail: Some("Response paused.".to_string()),
        }
    }

    /// Terminal marker for a failed turn
    pub fn failed(detail: impl Into<String>) -> Self {
        Outbound::Terminal {
            status: TurnStatus::Failed,
            detail: Some(detail.into()),
        }
    }

    /// Whether this frame ends a turn
    pub fn is_terminal(&self) -> bool {
        matches!(self, Outbound::Terminal { .. })
    }
}
