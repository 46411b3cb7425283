// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Streaming response handling
//!
//! Testable logic for folding a model event stream into content blocks,
//! separated from any I/O.

use std::collections::HashMap;

use crate::llm::provider::{ContentBlockDelta, ContentBlockResponse, StopReason, StreamEvent};

/// Accumulator for streaming response content
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    /// Accumulated content blocks
    content_blocks: Vec<ContentBlockResponse>,
    /// Stream block index -> position in content_blocks
    positions: HashMap<usize, usize>,
    /// Partial tool input JSON, by stream block index
    tool_inputs: HashMap<usize, String>,
    /// Stop reason from the stream
    stop_reason: Option<StopReason>,
    /// Whether any text has been output
    has_text_output: bool,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the accumulated content blocks
    pub fn content_blocks(&self) -> &[ContentBlockResponse] {
        &self.content_blocks
    }

    /// Get the stop reason
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// Check if any text has been output
    pub fn has_text_output(&self) -> bool {
        self.has_text_output
    }

    /// Process a stream event and return any text to forward
    pub fn process_event(&mut self, event: StreamEvent) -> StreamEventResult {
        match event {
            StreamEvent::ContentBlockStart {
                index,
                content_block,
            } => {
                self.positions.insert(index, self.content_blocks.len());
                self.content_blocks.push(content_block);
                StreamEventResult::BlockStarted
            }
            StreamEvent::ContentBlockDelta { index, delta } => match delta {
                ContentBlockDelta::TextDelta { text } => {
                    if let Some(ContentBlockResponse::Text { text: block_text }) = self
                        .positions
                        .get(&index)
                        .and_then(|pos| self.content_blocks.get_mut(*pos))
                    {
                        block_text.push_str(&text);
                        if !text.is_empty() {
                            self.has_text_output = true;
                        }
                    }
                    StreamEventResult::TextDelta(text)
                }
                ContentBlockDelta::InputJsonDelta { partial_json } => {
                    self.tool_inputs
                        .entry(index)
                        .or_default()
                        .push_str(&partial_json);
                    StreamEventResult::ToolInputDelta
                }
            },
            StreamEvent::ContentBlockStop { index } => {
                if let Some(partial) = self.tool_inputs.remove(&index) {
                    if let Some(ContentBlockResponse::ToolUse { input, .. }) = self
                        .positions
                        .get(&index)
                        .and_then(|pos| self.content_blocks.get_mut(*pos))
                    {
                        if let Ok(parsed) = serde_json::from_str(&partial) {
                            *input = parsed;
                        }
                    }
                }
                StreamEventResult::BlockStopped
            }
            StreamEvent::MessageDelta {
                stop_reason: sr, ..
            } => {
                self.stop_reason = sr;
                StreamEventResult::MessageDelta(sr)
            }
            StreamEvent::MessageStop => StreamEventResult::MessageStop,
            StreamEvent::Error {
                error_type,
                message,
            } => StreamEventResult::Error {
                error_type,
                message,
            },
            StreamEvent::MessageStart { .. } => StreamEventResult::MessageStart,
        }
    }

    /// Consume the accumulator and return the final results
    pub fn finish(self) -> (Vec<ContentBlockResponse>, Option<StopReason>) {
        (self.content_blocks, self.stop_reason)
    }
}

/// Result of processing a stream event
#[derive(Debug, Clone)]
pub enum StreamEventResult {
    /// A new content block started
    BlockStarted,
    /// Text delta received (contains the text to forward)
    TextDelta(String),
    /// Tool input JSON delta received
    ToolInputDelta,
    /// A content block stopped
    BlockStopped,
    /// Message delta with optional stop reason
    MessageDelta(Option<StopReason>),
    /// Message stopped
    MessageStop,
    /// Error occurred
    Error { error_type: String, message: String },
    /// Message started
    MessageStart,
}

impl StreamEventResult {
    /// Text to forward, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamEventResult::TextDelta(text) => Some(text),
            _ => None,
        }
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self, StreamEventResult::Error { .. })
    }
}

/// Builder for simulating stream events in tests
#[cfg(test)]
pub struct StreamEventBuilder;

#[cfg(test)]
impl StreamEventBuilder {
    pub fn text_block_start(index: usize) -> StreamEvent {
        StreamEvent::ContentBlockStart {
            index,
            content_block: ContentBlockResponse::Text {
                text: String::new(),
            },
        }
    }

    pub fn tool_use_start(index: usize, id: &str, name: &str) -> StreamEvent {
        StreamEvent::ContentBlockStart {
            index,
            content_block: ContentBlockResponse::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input: serde_json::json!({}),
            },
        }
    }

    pub fn text_delta(index: usize, text: &str) -> StreamEvent {
        StreamEvent::ContentBlockDelta {
            index,
            delta: ContentBlockDelta::TextDelta {
                text: text.to_string(),
            },
        }
    }

    pub fn input_delta(index: usize, json: &str) -> StreamEvent {
        StreamEvent::ContentBlockDelta {
            index,
            delta: ContentBlockDelta::InputJsonDelta {
                partial_json: json.to_string(),
            },
        }
    }

    pub fn block_stop(index: usize) -> StreamEvent {
        StreamEvent::ContentBlockStop { index }
    }

    pub fn message_delta(stop_reason: Option<StopReason>) -> StreamEvent {
        StreamEvent::MessageDelta {
            stop_reason,
            usage: None,
        }
    }

    pub fn message_stop() -> StreamEvent {
        StreamEvent::MessageStop
    }
}
