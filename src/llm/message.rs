// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Message types for LLM interactions
//!
//! Defines the message structures that make up a session's conversation
//! history and the context window handed to the model.

use crate::config::ConversationConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for the message
    pub id: Uuid,

    /// Role of the message sender
    pub role: Role,

    /// Content of the message
    pub content: MessageContent,

    /// When the message was created
    pub timestamp: DateTime<Utc>,
}

/// Role of the message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message
    User,
    /// Assistant response
    Assistant,
    /// Tool invocation record (paired tool-call and tool-result blocks)
    Tool,
}

/// Content of a message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple text content
    Text(String),
    /// Multiple content blocks (text, tool use, tool result)
    Blocks(Vec<ContentBlock>),
}

/// A block of content within a message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text content
    Text { text: String },

    /// Tool invocation requested by the model
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// Result of a tool invocation
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            content: MessageContent::Text(content.into()),
            timestamp: Utc::now(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: MessageContent::Text(content.into()),
            timestamp: Utc::now(),
        }
    }

    /// Create a new assistant message with content blocks
    pub fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: MessageContent::Blocks(blocks),
            timestamp: Utc::now(),
        }
    }

    /// Create a tool message recording one round of tool calls and results
    pub fn tool_exchange(blocks: Vec<ContentBlock>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Tool,
            content: MessageContent::Blocks(blocks),
            timestamp: Utc::now(),
        }
    }

    /// Get the text content of the message (if it's a simple text message)
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) => Some(text),
            MessageContent::Blocks(blocks) => blocks.iter().find_map(|block| {
                if let ContentBlock::Text { text } = block {
                    Some(text.as_str())
                } else {
                    None
                }
            }),
        }
    }

    /// Get all tool use blocks from the message
    pub fn tool_uses(&self) -> Vec<&ContentBlock> {
        match &self.content {
            MessageContent::Text(_) => vec![],
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter(|block| matches!(block, ContentBlock::ToolUse { .. }))
                .collect(),
        }
    }

    /// Check if message has any tool use
    pub fn has_tool_use(&self) -> bool {
        !self.tool_uses().is_empty()
    }

    /// Estimated token count for this message
    pub fn estimate_tokens(&self, config: &ConversationConfig) -> u32 {
        let chars = match &self.content {
            MessageContent::Text(text) => text.len(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .map(|b| match b {
                    ContentBlock::Text { text } => text.len(),
                    ContentBlock::ToolUse { name, input, .. } => {
                        name.len() + input.to_string().len()
                    }
                    ContentBlock::ToolResult { content, .. } => content.len(),
                })
                .sum(),
        };
        (chars as u32 / config.chars_per_token).max(1)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// Conversation history for one session
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    /// All messages in the conversation, in insertion order
    pub messages: Vec<Message>,

    /// System prompt (if any)
    pub system_prompt: Option<String>,

    /// Token estimation configuration
    config: ConversationConfig,
}

impl Conversation {
    /// Create a new empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a conversation with custom configuration
    pub fn with_config(config: ConversationConfig) -> Self {
        Self {
            messages: Vec::new(),
            system_prompt: None,
            config,
        }
    }

    /// Create a conversation with a system prompt
    pub fn with_system(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![],
            system_prompt: Some(system_prompt.into()),
            config: ConversationConfig::default(),
        }
    }

    /// Get the conversation config
    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    /// Set the system prompt
    pub fn set_system(&mut self, system_prompt: impl Into<String>) {
        self.system_prompt = Some(system_prompt.into());
    }

    /// Add a message to the conversation
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Get the last assistant message
    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
    }

    /// Check if the conversation is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Get message count
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Estimate the total token count for the conversation
    pub fn estimate_tokens(&self) -> u32 {
        let chars_per_token = self.config.chars_per_token.max(1);
        let system_tokens = self
            .system_prompt
            .as_ref()
            .map(|s| s.len() as u32 / chars_per_token)
            .unwrap_or(0);

        let message_tokens: u32 = self
            .messages
            .iter()
            .map(|m| m.estimate_tokens(&self.config))
            .sum();

        system_tokens + message_tokens
    }

    /// Trim the conversation in-place to fit within the token limit.
    /// Evicts oldest messages first; deterministic for a given history.
    /// Returns the number of messages removed.
    pub fn trim_to_fit(&mut self, max_tokens: u32) -> usize {
        let chars_per_token = self.config.chars_per_token.max(1);
        let system_tokens = self
            .system_prompt
            .as_ref()
            .map(|s| s.len() as u32 / chars_per_token)
            .unwrap_or(0);

        let available = max_tokens
            .saturating_sub(system_tokens)
            .saturating_sub(self.config.response_buffer_tokens);

        if available == 0 {
            let removed = self.messages.len();
            self.messages.clear();
            return removed;
        }

        // Walk backwards from the newest message to find the retained suffix
        let mut total_tokens = 0_u32;
        let mut keep_from = self.messages.len();

        for (i, message) in self.messages.iter().enumerate().rev() {
            let msg_tokens = message.estimate_tokens(&self.config);
            if total_tokens + msg_tokens > available {
                break;
            }
            total_tokens += msg_tokens;
            keep_from = i;
        }

        let removed = keep_from;
        if removed > 0 {
            self.messages.drain(..removed);
        }
        removed
    }
}
