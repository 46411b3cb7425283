// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Mock LLM provider for testing
//!
//! Provides a configurable mock implementation of the LlmProvider trait
//! that can be used in tests without making real API calls.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::Result;
use crate::llm::provider::{
    CompletionRequest, ContentBlockDelta, ContentBlockResponse, EventStream, LlmProvider,
    StopReason, StreamEvent, Usage,
};

/// A mock LLM provider for testing
#[derive(Clone)]
pub struct MockProvider {
    /// Provider name
    name: String,
    /// Configured responses, consumed in order (last one repeats)
    responses: Arc<Mutex<Vec<MockResponse>>>,
    /// Call counter
    call_count: Arc<AtomicUsize>,
    /// Recorded requests
    recorded_requests: Arc<Mutex<Vec<CompletionRequest>>>,
    /// Optional delay between streamed fragments
    chunk_delay: Option<Duration>,
    /// If set, the stream reports this error instead of a response
    stream_error: Option<String>,
}

/// A pre-configured response for the mock provider
#[derive(Clone, Debug)]
pub struct MockResponse {
    /// Text content to return
    pub text: String,
    /// Tool calls to return (optional)
    pub tool_calls: Vec<MockToolCall>,
    /// Stop reason
    pub stop_reason: StopReason,
    /// Token usage
    pub usage: Usage,
}

/// A mock tool call
#[derive(Clone, Debug)]
pub struct MockToolCall {
    /// Tool call ID
    pub id: String,
    /// Tool name
    pub name: String,
    /// Tool input (JSON)
    pub input: serde_json::Value,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProvider {
    /// Create a new mock provider
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            responses: Arc::new(Mutex::new(vec![MockResponse::default()])),
            call_count: Arc::new(AtomicUsize::new(0)),
            recorded_requests: Arc::new(Mutex::new(vec![])),
            chunk_delay: None,
            stream_error: None,
        }
    }

    /// Set the text response
    pub fn with_response(self, text: impl Into<String>) -> Self {
        {
            let mut responses = match self.responses.lock() {
                Ok(guard) => guard,
                Err(poisoned) => {
                    tracing::warn!("Mock provider responses lock was poisoned, recovering");
                    poisoned.into_inner()
                }
            };
            responses.clear();
            responses.push(MockResponse {
                text: text.into(),
                ..Default::default()
            });
        }
        self
    }

    /// Queue multiple responses (returned in order)
    pub fn with_responses(self, texts: Vec<String>) -> Self {
        {
            let mut responses = match self.responses.lock() {
                Ok(guard) => guard,
                Err(poisoned) => {
                    tracing::warn!("Mock provider responses lock was poisoned, recovering");
                    poisoned.into_inner()
                }
            };
            responses.clear();
            for text in texts {
                responses.push(MockResponse {
                    text,
                    ..Default::default()
                });
            }
        }
        self
    }

    /// Queue a scripted sequence of full responses
    pub fn with_sequence(self, sequence: Vec<MockResponse>) -> Self {
        {
            let mut responses = match self.responses.lock() {
                Ok(guard) => guard,
                Err(poisoned) => {
                    tracing::warn!("Mock provider responses lock was poisoned, recovering");
                    poisoned.into_inner()
                }
            };
            *responses = sequence;
        }
        self
    }

    /// Set a tool call response
    pub fn with_tool_call(self, name: impl Into<String>, input: serde_json::Value) -> Self {
        {
            let mut responses = match self.responses.lock() {
                Ok(guard) => guard,
                Err(poisoned) => {
                    tracing::warn!("Mock provider responses lock was poisoned, recovering");
                    poisoned.into_inner()
                }
            };
            responses.clear();
            responses.push(MockResponse::tool_call(name, input));
        }
        self
    }

    /// Delay between streamed fragments, so tests can interleave other work
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    /// Make every stream report an in-band error
    pub fn with_stream_error(mut self, message: impl Into<String>) -> Self {
        self.stream_error = Some(message.into());
        self
    }

    /// Get the number of times complete_stream() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get all recorded requests
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.recorded_requests.lock().unwrap().clone()
    }

    /// Get the last request made
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.recorded_requests.lock().unwrap().last().cloned()
    }

    /// Reset call count and recorded requests
    pub fn reset(&self) {
        self.call_count.store(0, Ordering::SeqCst);
        self.recorded_requests.lock().unwrap().clear();
    }

    /// Get the next response
    fn next_response(&self) -> MockResponse {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst);
        let responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            MockResponse::default()
        } else {
            responses[count.min(responses.len() - 1)].clone()
        }
    }
}

impl MockResponse {
    /// A plain text response
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// A response that requests one tool call
    pub fn tool_call(name: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            text: String::new(),
            tool_calls: vec![MockToolCall {
                id: format!("call_{}", uuid::Uuid::new_v4().simple()),
                name: name.into(),
                input,
            }],
            stop_reason: StopReason::ToolUse,
            usage: Usage::default(),
        }
    }
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            text: "Mock response".to_string(),
            tool_calls: vec![],
            stop_reason: StopReason::EndTurn,
            usage: Usage {
                input_tokens: 10,
                output_tokens: 20,
            },
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<EventStream> {
        self.recorded_requests.lock().unwrap().push(request.clone());

        if let Some(message) = &self.stream_error {
            let events = vec![Ok(StreamEvent::Error {
                error_type: "server_error".to_string(),
                message: message.clone(),
            })];
            return Ok(Box::pin(stream::iter(events)));
        }

        let response = self.next_response();
        let model = request.model.clone();
        let msg_id = format!("msg_{}", uuid::Uuid::new_v4().simple());

        let mut events = vec![Ok(StreamEvent::MessageStart {
            id: msg_id,
            model,
        })];

        if !response.text.is_empty() {
            events.push(Ok(StreamEvent::ContentBlockStart {
                index: 0,
                content_block: ContentBlockResponse::Text {
                    text: String::new(),
                },
            }));

            // Stream the text in chunks
            for chunk in response.text.chars().collect::<Vec<_>>().chunks(10) {
                let text: String = chunk.iter().collect();
                events.push(Ok(StreamEvent::ContentBlockDelta {
                    index: 0,
                    delta: ContentBlockDelta::TextDelta { text },
                }));
            }

            events.push(Ok(StreamEvent::ContentBlockStop { index: 0 }));
        }

        for (i, tool_call) in response.tool_calls.into_iter().enumerate() {
            let index = if response.text.is_empty() { i } else { i + 1 };
            events.push(Ok(StreamEvent::ContentBlockStart {
                index,
                content_block: ContentBlockResponse::ToolUse {
                    id: tool_call.id,
                    name: tool_call.name,
                    input: tool_call.input,
                },
            }));
            events.push(Ok(StreamEvent::ContentBlockStop { index }));
        }

        events.push(Ok(StreamEvent::MessageDelta {
            stop_reason: Some(response.stop_reason),
            usage: Some(response.usage),
        }));
        events.push(Ok(StreamEvent::MessageStop));

        match self.chunk_delay {
            Some(delay) => Ok(Box::pin(stream::iter(events).then(move |event| async move {
                tokio::time::sleep(delay).await;
                event
            }))),
            None => Ok(Box::pin(stream::iter(events))),
        }
    }
}
