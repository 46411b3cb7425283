// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! OpenAI API provider implementation
//!
//! Implements the LlmProvider trait against the OpenAI-compatible
//! chat-completions endpoint with SSE streaming.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ApiError, Result, SkyError};
use crate::llm::message::{ContentBlock, Message, MessageContent, Role};
use crate::llm::provider::{
    CompletionRequest, ContentBlockDelta, ContentBlockResponse, EventStream, LlmProvider,
    StopReason, StreamEvent, ToolChoice, ToolDefinition, Usage,
};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI chat-completions provider (works with any OpenAI-compatible endpoint)
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: OPENAI_API_URL.to_string(),
        }
    }

    /// Create with a custom base URL
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Convert internal messages to OpenAI wire format.
    ///
    /// Tool exchange messages are expanded into the pair the API expects:
    /// an assistant message carrying tool_calls followed by one "tool"
    /// message per result.
    fn convert_messages(&self, messages: &[Message], system: Option<&str>) -> Vec<OpenAiMessage> {
        let mut result = Vec::new();

        if let Some(sys) = system {
            result.push(OpenAiMessage {
                role: "system".to_string(),
                content: Some(sys.to_string()),
                tool_calls: None,
                tool_call_id: None,
            });
        }

        for m in messages {
            let role = match m.role {
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "assistant", // carries tool_calls; results follow
            };

            match &m.content {
                MessageContent::Text(text) => {
                    result.push(OpenAiMessage {
                        role: role.to_string(),
                        content: Some(text.clone()),
                        tool_calls: None,
                        tool_call_id: None,
                    });
                }
                MessageContent::Blocks(blocks) => {
                    let mut text_parts = Vec::new();
                    let mut tool_calls = Vec::new();
                    let mut tool_results = Vec::new();

                    for block in blocks {
                        match block {
                            ContentBlock::Text { text } => {
                                text_parts.push(text.clone());
                            }
                            ContentBlock::ToolUse { id, name, input } => {
                                tool_calls.push(OpenAiToolCall {
                                    id: id.clone(),
                                    r#type: "function".to_string(),
                                    function: OpenAiFunctionCall {
                                        name: name.clone(),
                                        arguments: serde_json::to_string(input)
                                            .unwrap_or_default(),
                                    },
                                });
                            }
                            ContentBlock::ToolResult {
                                tool_use_id,
                                content,
                                is_error,
                            } => {
                                let result_content = if is_error.unwrap_or(false) {
                                    format!("Error: {}", content)
                                } else {
                                    content.clone()
                                };
                                tool_results.push((tool_use_id.clone(), result_content));
                            }
                        }
                    }

                    if !tool_calls.is_empty() || !text_parts.is_empty() {
                        result.push(OpenAiMessage {
                            role: role.to_string(),
                            content: if text_parts.is_empty() {
                                None
                            } else {
                                Some(text_parts.join("\n"))
                            },
                            tool_calls: if tool_calls.is_empty() {
                                None
                            } else {
                                Some(tool_calls)
                            },
                            tool_call_id: None,
                        });
                    }

                    for (tool_use_id, content) in tool_results {
                        result.push(OpenAiMessage {
                            role: "tool".to_string(),
                            content: Some(content),
                            tool_calls: None,
                            tool_call_id: Some(tool_use_id),
                        });
                    }
                }
            }
        }

        result
    }

    /// Convert tools to OpenAI function format
    fn convert_tools(&self, tools: &[ToolDefinition]) -> Vec<OpenAiTool> {
        tools
            .iter()
            .map(|t| OpenAiTool {
                r#type: "function".to_string(),
                function: OpenAiFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: serde_json::json!({
                        "type": t.input_schema.schema_type,
                        "properties": t.input_schema.properties,
                        "required": t.input_schema.required,
                    }),
                },
            })
            .collect()
    }

    /// Build the request body
    fn build_request(&self, request: &CompletionRequest) -> OpenAiRequest {
        let tool_choice = match &request.tool_choice {
            ToolChoice::Auto => Some("auto".to_string()),
            ToolChoice::None => Some("none".to_string()),
            ToolChoice::Required => Some("required".to_string()),
        };

        OpenAiRequest {
            model: request.model.clone(),
            messages: self.convert_messages(&request.messages, request.system.as_deref()),
            max_tokens: Some(request.max_tokens),
            temperature: Some(request.temperature),
            tools: if request.tools.is_empty() {
                None
            } else {
                Some(self.convert_tools(&request.tools))
            },
            tool_choice: if request.tools.is_empty() {
                None
            } else {
                tool_choice
            },
            stream: true,
        }
    }

    /// Parse an error response
    fn parse_error(&self, status: u16, body: &str) -> SkyError {
        if let Ok(error_response) = serde_json::from_str::<OpenAiError>(body) {
            let message = error_response.error.message;
            let code = error_response.error.code.as_deref().unwrap_or("");

            match code {
                "invalid_api_key" | "authentication_error" => {
                    SkyError::Api(ApiError::AuthenticationFailed)
                }
                "rate_limit_exceeded" => SkyError::Api(ApiError::RateLimited(60)),
                _ => SkyError::Api(ApiError::ServerError { status, message }),
            }
        } else {
            SkyError::Api(ApiError::ServerError {
                status,
                message: body.to_string(),
            })
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete_stream(&self, request: CompletionRequest) -> Result<EventStream> {
        let body = self.build_request(&request);

        let response = self
            .client
            .post(&self.base_url)
            .header("Authorization", format!("Bearer {}", &self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SkyError::Api(ApiError::Timeout)
                } else {
                    SkyError::Api(ApiError::Network(e.to_string()))
                }
            })?;

        let status = response.status().as_u16();

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status, &body));
        }

        let byte_stream = response.bytes_stream();

        // State for stream processing:
        // (line buffer, message_started, active tool index, accumulated tool args)
        type StreamState = (String, bool, Option<usize>, Vec<String>);

        let event_stream = byte_stream
            .map(|result| result.map_err(|e| SkyError::Api(ApiError::StreamError(e.to_string()))))
            .scan(
                (String::new(), false, None::<usize>, Vec::new()),
                |state: &mut StreamState, result| {
                    let (buffer, message_started, tool_idx, tool_args) = state;

                    let chunk = match result {
                        Ok(bytes) => String::from_utf8_lossy(&bytes).to_string(),
                        Err(e) => return futures::future::ready(Some(vec![Err(e)])),
                    };

                    buffer.push_str(&chunk);

                    let mut events = Vec::new();

                    while let Some(line_end) = buffer.find('\n') {
                        let line = buffer[..line_end].trim().to_string();
                        *buffer = buffer[line_end + 1..].to_string();

                        if line.is_empty() || line.starts_with(':') {
                            continue;
                        }

                        if let Some(data) = line.strip_prefix("data: ") {
                            if data == "[DONE]" {
                                events.push(Ok(StreamEvent::MessageStop));
                                continue;
                            }

                            if let Ok(chunk) = serde_json::from_str::<OpenAiStreamChunk>(data) {
                                if !*message_started {
                                    *message_started = true;
                                    events.push(Ok(StreamEvent::MessageStart {
                                        id: chunk.id.clone(),
                                        model: chunk.model.clone().unwrap_or_default(),
                                    }));
                                    events.push(Ok(StreamEvent::ContentBlockStart {
                                        index: 0,
                                        content_block: ContentBlockResponse::Text {
                                            text: String::new(),
                                        },
                                    }));
                                }

                                if let Some(choice) = chunk.choices.into_iter().next() {
                                    let delta = choice.delta;

                                    if let Some(text) = delta.content {
                                        if !text.is_empty() {
                                            events.push(Ok(StreamEvent::ContentBlockDelta {
                                                index: 0,
                                                delta: ContentBlockDelta::TextDelta { text },
                                            }));
                                        }
                                    }

                                    if let Some(tool_calls) = delta.tool_calls {
                                        for tc in tool_calls {
                                            let tc_index = tc.index.unwrap_or(0);

                                            if *tool_idx != Some(tc_index) {
                                                // Close the previous tool block so its
                                                // accumulated arguments get parsed
                                                if let Some(prev) = *tool_idx {
                                                    events.push(Ok(
                                                        StreamEvent::ContentBlockStop {
                                                            index: prev + 1,
                                                        },
                                                    ));
                                                }
                                                *tool_idx = Some(tc_index);
                                                tool_args.resize(tc_index + 1, String::new());

                                                if let Some(ref func) = tc.function {
                                                    events.push(Ok(
                                                        StreamEvent::ContentBlockStart {
                                                            index: tc_index + 1,
                                                            content_block:
                                                                ContentBlockResponse::ToolUse {
                                                                    id: tc
                                                                        .id
                                                                        .clone()
                                                                        .unwrap_or_else(|| {
                                                                            format!(
                                                                                "tool_{}",
                                                                                tc_index
                                                                            )
                                                                        }),
                                                                    name: func
                                                                        .name
                                                                        .clone()
                                                                        .unwrap_or_default(),
                                                                    input:
                                                                        serde_json::Value::Object(
                                                                            serde_json::Map::new(),
                                                                        ),
                                                                },
                                                        },
                                                    ));
                                                }
                                            }

                                            if let Some(ref func) = tc.function {
                                                if let Some(ref args) = func.arguments {
                                                    if let Some(acc) =
                                                        tool_args.get_mut(tc_index)
                                                    {
                                                        acc.push_str(args);
                                                    }
                                                    events.push(Ok(
                                                        StreamEvent::ContentBlockDelta {
                                                            index: tc_index + 1,
                                                            delta:
                                                                ContentBlockDelta::InputJsonDelta {
                                                                    partial_json: args.clone(),
                                                                },
                                                        },
                                                    ));
                                                }
                                            }
                                        }
                                    }

                                    if let Some(finish_reason) = choice.finish_reason {
                                        if let Some(ti) = *tool_idx {
                                            events.push(Ok(StreamEvent::ContentBlockStop {
                                                index: ti + 1,
                                            }));
                                        }
                                        events.push(Ok(StreamEvent::ContentBlockStop {
                                            index: 0,
                                        }));

                                        let stop_reason = match finish_reason.as_str() {
                                            "length" => Some(StopReason::MaxTokens),
                                            "tool_calls" | "function_call" => {
                                                Some(StopReason::ToolUse)
                                            }
                                            _ => Some(StopReason::EndTurn),
                                        };

                                        events.push(Ok(StreamEvent::MessageDelta {
                                            stop_reason,
                                            usage: chunk.usage.map(|u| Usage {
                                                input_tokens: u.prompt_tokens,
                                                output_tokens: u.completion_tokens,
                                            }),
                                        }));
                                    }
                                }
                            }
                        }
                    }

                    futures::future::ready(Some(events))
                },
            )
            .flat_map(futures::stream::iter);

        Ok(Box::pin(event_stream))
    }
}

// OpenAI wire types

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type")]
    r#type: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    r#type: String,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorDetail {
    message: String,
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    id: String,
    model: Option<String>,
    choices: Vec<OpenAiStreamChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiStreamToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamToolCall {
    index: Option<usize>,
    id: Option<String>,
    function: Option<OpenAiStreamFunction>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamFunction {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
