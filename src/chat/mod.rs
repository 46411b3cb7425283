// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Chat module for Sky
//!
//! The streaming conversation engine, session management, and the
//! outbound frame types sessions speak to their clients.

pub mod dispatcher;
pub mod engine;
pub mod session;
pub mod streaming;
pub mod transport;

pub use engine::{CompletedTurn, ConversationEngine, SYSTEM_PROMPT};
pub use session::{SessionId, SessionManager, Submission, PAUSE_TOKEN};
pub use transport::{Outbound, TurnStatus};
