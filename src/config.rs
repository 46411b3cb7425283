// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Settings management for Sky
//!
//! Handles loading and saving settings from ~/.sky/settings.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, SkyError};

/// Main settings structure, stored in ~/.sky/settings.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// LLM provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Flight-data source configuration
    #[serde(default)]
    pub flight_data: FlightDataConfig,

    /// Conversation and token management settings
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Engine behavior for a single turn
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Configuration for the LLM provider (OpenAI-compatible endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Chat-completions endpoint
    #[serde(default = "default_provider_url")]
    pub base_url: String,

    /// Default model
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_provider_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o".to_string(),
        }
    }
}

/// Configuration for the remote flight-data provider and its fallback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightDataConfig {
    /// Environment variable holding the AviationStack access key
    #[serde(default = "default_flight_key_env")]
    pub api_key_env: String,

    /// Base URL of the flights endpoint
    #[serde(default = "default_flight_url")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_flight_timeout")]
    pub timeout_secs: u64,

    /// Consecutive failures before the remote is put on cooldown
    #[serde(default = "default_max_failures")]
    pub max_failures: u32,

    /// Cooldown period in seconds before the remote is probed again
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
}

fn default_flight_key_env() -> String {
    "AVIATIONSTACK_API_KEY".to_string()
}

fn default_flight_url() -> String {
    "http://api.aviationstack.com/v1/flights".to_string()
}

fn default_flight_timeout() -> u64 {
    15
}

fn default_max_failures() -> u32 {
    3
}

fn default_cooldown() -> u64 {
    60
}

impl Default for FlightDataConfig {
    fn default() -> Self {
        Self {
            api_key_env: "AVIATIONSTACK_API_KEY".to_string(),
            base_url: "http://api.aviationstack.com/v1/flights".to_string(),
            timeout_secs: 15,
            max_failures: 3,
            cooldown_secs: 60,
        }
    }
}

/// Conversation and token management settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Heuristic characters-per-token used for estimation
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: u32,

    /// Tokens reserved for the model response when trimming history
    #[serde(default = "default_response_buffer")]
    pub response_buffer_tokens: u32,

    /// Token budget for a session's retained history
    #[serde(default = "default_max_context")]
    pub max_context_tokens: u32,
}

fn default_chars_per_token() -> u32 {
    4
}

fn default_response_buffer() -> u32 {
    2048
}

fn default_max_context() -> u32 {
    64_000
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            chars_per_token: 4,
            response_buffer_tokens: 2048,
            max_context_tokens: 64_000,
        }
    }
}

/// Engine behavior for a single turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum tokens in a model response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tool rounds within one turn
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tool_rounds() -> usize {
    4
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.7,
            max_tool_rounds: 4,
        }
    }
}

impl Settings {
    /// Directory where Sky stores its settings
    pub fn config_dir() -> PathBuf {
        dirs::home_dir().unwrap_or_default().join(".sky")
    }

    /// Path of the settings file
    pub fn settings_path() -> PathBuf {
        Self::config_dir().join("settings.toml")
    }

    /// Load settings from disk, falling back to defaults if absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::settings_path())
    }

    /// Load settings from a specific path
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let settings = toml::from_str(&raw)?;
        Ok(settings)
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::settings_path())
    }

    /// Save settings to a specific path
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    /// Resolve the LLM API key from the configured environment variable
    pub fn provider_api_key(&self) -> Result<String> {
        std::env::var(&self.provider.api_key_env).map_err(|_| {
            SkyError::Config(format!(
                "missing API key: set the {} environment variable",
                self.provider.api_key_env
            ))
        })
    }

    /// Resolve the flight-data access key, if configured
    pub fn flight_data_api_key(&self) -> Option<String> {
        std::env::var(&self.flight_data.api_key_env).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.provider.model, "gpt-4o");
        assert_eq!(settings.flight_data.timeout_secs, 15);
        assert_eq!(settings.conversation.chars_per_token, 4);
        assert_eq!(settings.engine.max_tool_rounds, 4);
    }

    #[test]
    fn test_settings_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(settings.provider.model, "gpt-4o");
    }

    #[test]
    fn test_settings_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");

        let mut settings = Settings::default();
        settings.provider.model = "gpt-4o-mini".to_string();
        settings.flight_data.cooldown_secs = 120;
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.provider.model, "gpt-4o-mini");
        assert_eq!(loaded.flight_data.cooldown_secs, 120);
    }

    #[test]
    fn test_settings_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "[engine]\nmax_tool_rounds = 2\n").unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.engine.max_tool_rounds, 2);
        assert_eq!(loaded.provider.model, "gpt-4o");
    }

    #[test]
    fn test_settings_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "not valid {{{").unwrap();

        assert!(Settings::load_from(&path).is_err());
    }
}
