// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! LLM module for Sky
//!
//! Provides abstraction over the streaming model backend.

pub mod message;
pub mod mock_provider;
pub mod openai;
pub mod provider;

pub use message::*;
pub use provider::*;
