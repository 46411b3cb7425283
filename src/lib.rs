// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Sky - streaming airline assistant with grounded flight data.
//!
//! This crate exposes the runtime used by the `sky` CLI (`src/main.rs`):
//! - `chat`: streaming conversation engine, sessions, and turn dispatch
//! - `llm`: provider abstraction and implementations (OpenAI/mock)
//! - `flightdata`: remote flight data with health tracking and a local fallback
//! - `booking`: in-memory booking directory
//! - `tools`: the closed set of tools the model can call

pub mod booking;
pub mod chat;
pub mod config;
pub mod error;
pub mod flightdata;
pub mod llm;
pub mod tools;

pub use error::{Result, SkyError};
