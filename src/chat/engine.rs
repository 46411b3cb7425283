// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Conversation engine
//!
//! Runs one turn against the model: streams text fragments out as they
//! arrive, executes requested tool calls between rounds, and yields the
//! condensed messages to append to history once the turn completes.
//! Cancellation is cooperative and checked at every suspension point.

use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::chat::streaming::{StreamAccumulator, StreamEventResult};
use crate::config::EngineConfig;
use crate::error::{ApiError, Result, SkyError};
use crate::llm::message::{ContentBlock, Message};
use crate::llm::provider::{CompletionRequest, ContentBlockResponse, LlmProvider, StopReason};
use crate::tools::ToolRouter;

/// System prompt for the Sky assistant
pub const SYSTEM_PROMPT: &str = "\
You are a friendly and highly efficient airline customer support agent named Sky.
Your goal is to assist users with their booking and flight inquiries.
- Present flight status or search results clearly using bullet points.
- Use the provided tools for answering questions.
- If details are missing (like flight number), ask for them.
- Maintain a positive, conversational tone.
- When an answer comes from backup data rather than a live source, say so.";

/// Everything a completed turn adds to the session
#[derive(Debug, Clone)]
pub struct CompletedTurn {
    /// Condensed messages to append to history (tool exchanges, then
    /// the final assistant message)
    pub messages: Vec<Message>,
    /// Full assistant answer; equals the concatenation of all fragments
    /// sent during the turn
    pub answer: String,
}

/// Drives one streaming turn at a time
pub struct ConversationEngine {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRouter>,
    model: String,
    config: EngineConfig,
}

impl ConversationEngine {
    /// Create a new engine
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRouter>,
        model: impl Into<String>,
        config: EngineConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            model: model.into(),
            config,
        }
    }

    /// Run a single turn over the given history snapshot.
    ///
    /// The snapshot already ends with the user's message. Fragments are
    /// sent through `fragments` in arrival order; nothing is retained
    /// from a turn that returns an error.
    pub async fn run_turn(
        &self,
        snapshot: Vec<Message>,
        fragments: mpsc::UnboundedSender<String>,
        cancel: CancellationToken,
    ) -> Result<CompletedTurn> {
        let mut working = snapshot;
        let mut new_messages: Vec<Message> = Vec::new();
        let mut answer = String::new();

        for round in 0..=self.config.max_tool_rounds {
            if cancel.is_cancelled() {
                return Err(SkyError::TurnCancelled);
            }

            let request = CompletionRequest::new(self.model.clone(), working.clone())
                .with_system(SYSTEM_PROMPT)
                .with_max_tokens(self.config.max_tokens)
                .with_temperature(self.config.temperature)
                .with_tools(self.tools.definitions());

            let mut stream = tokio::select! {
                _ = cancel.cancelled() => return Err(SkyError::TurnCancelled),
                result = self.provider.complete_stream(request) => result?,
            };

            let mut accumulator = StreamAccumulator::new();

            loop {
                let event = tokio::select! {
                    _ = cancel.cancelled() => return Err(SkyError::TurnCancelled),
                    event = stream.next() => event,
                };

                let Some(event) = event else { break };

                match accumulator.process_event(event?) {
                    StreamEventResult::TextDelta(text) => {
                        if !text.is_empty() {
                            answer.push_str(&text);
                            // Receiver gone means the turn is being torn down
                            if fragments.send(text).is_err() {
                                return Err(SkyError::TurnCancelled);
                            }
                        }
                    }
                    StreamEventResult::Error {
                        error_type,
                        message,
                    } => {
                        return Err(SkyError::Api(ApiError::StreamError(format!(
                            "{}: {}",
                            error_type, message
                        ))));
                    }
                    StreamEventResult::MessageStop => break,
                    _ => {}
                }
            }

            let (blocks, stop_reason) = accumulator.finish();

            let tool_uses: Vec<(String, String, serde_json::Value)> = blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlockResponse::ToolUse { id, name, input } => {
                        Some((id.clone(), name.clone(), input.clone()))
                    }
                    _ => None,
                })
                .collect();

            let wants_tools = stop_reason == Some(StopReason::ToolUse) && !tool_uses.is_empty();

            if !wants_tools {
                new_messages.push(Message::assistant(answer.clone()));
                tracing::debug!(rounds = round + 1, chars = answer.len(), "turn complete");
                return Ok(CompletedTurn {
                    messages: new_messages,
                    answer,
                });
            }

            if round == self.config.max_tool_rounds {
                tracing::warn!(
                    max_rounds = self.config.max_tool_rounds,
                    "tool round limit reached, finishing turn"
                );
                new_messages.push(Message::assistant(answer.clone()));
                return Ok(CompletedTurn {
                    messages: new_messages,
                    answer,
                });
            }

            // Execute the requested tools and record the exchange. Text
            // streamed during this round stays with its tool calls so
            // later rounds see the full assistant turn.
            let round_text: String = blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlockResponse::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect();

            let mut exchange: Vec<ContentBlock> = Vec::new();
            if !round_text.is_empty() {
                exchange.push(ContentBlock::Text { text: round_text });
            }
            exchange.extend(tool_uses.iter().map(|(id, name, input)| {
                ContentBlock::ToolUse {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                }
            }));

            for (id, name, input) in &tool_uses {
                if cancel.is_cancelled() {
                    return Err(SkyError::TurnCancelled);
                }

                let reply = tokio::select! {
                    _ = cancel.cancelled() => return Err(SkyError::TurnCancelled),
                    reply = self.tools.dispatch(id, name, input) => reply,
                };

                exchange.push(ContentBlock::ToolResult {
                    tool_use_id: reply.tool_use_id,
                    content: reply.output,
                    is_error: if reply.is_error { Some(true) } else { None },
                });
            }

            let tool_message = Message::tool_exchange(exchange);
            working.push(tool_message.clone());
            new_messages.push(tool_message);
        }

        // Loop always returns from within; rounds are bounded
        Err(SkyError::Api(ApiError::InvalidResponse(
            "model never finished the turn".to_string(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::BookingDirectory;
    use crate::flightdata::FlightDataFacade;
    use crate::llm::mock_provider::{MockProvider, MockResponse};
    use crate::llm::message::Role;

    fn engine_with(provider: MockProvider) -> ConversationEngine {
        let tools = Arc::new(ToolRouter::new(
            Arc::new(FlightDataFacade::fallback_only()),
            Arc::new(BookingDirectory::new()),
        ));
        ConversationEngine::new(
            Arc::new(provider),
            tools,
            "mock-model",
            EngineConfig::default(),
        )
    }

    fn collect_fragments(
        rx: &mut mpsc::UnboundedReceiver<String>,
    ) -> String {
        let mut out = String::new();
        while let Ok(text) = rx.try_recv() {
            out.push_str(&text);
        }
        out
    }

    #[tokio::test]
    async fn test_plain_text_turn() {
        let engine = engine_with(MockProvider::new().with_response("Hello! How can I help?"));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let turn = engine
            .run_turn(
                vec![Message::user("Hi")],
                tx,
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(turn.answer, "Hello! How can I help?");
        assert_eq!(turn.messages.len(), 1);
        assert_eq!(turn.messages[0].role, Role::Assistant);
        // Fragments concatenate to the recorded answer
        assert_eq!(collect_fragments(&mut rx), turn.answer);
    }

    #[tokio::test]
    async fn test_tool_round_produces_exchange_and_answer() {
        let provider = MockProvider::new().with_sequence(vec![
            MockResponse::tool_call(
                "get_flight_status",
                serde_json::json!({"flight_number": "AA123"}),
            ),
            MockResponse::text("AA123 departs JFK at 08:00 and is on time."),
        ]);
        let engine = engine_with(provider);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let turn = engine
            .run_turn(
                vec![Message::user("Where is AA123?")],
                tx,
                CancellationToken::new(),
            )
            .await
            .unwrap();

        // One tool exchange plus the final assistant message
        assert_eq!(turn.messages.len(), 2);
        assert_eq!(turn.messages[0].role, Role::Tool);
        assert_eq!(turn.messages[1].role, Role::Assistant);
        assert!(turn.answer.contains("on time"));
        assert_eq!(collect_fragments(&mut rx), turn.answer);

        // The exchange pairs the call with its result
        let uses = turn.messages[0].tool_uses();
        assert_eq!(uses.len(), 1);
    }

    #[tokio::test]
    async fn test_pre_cancelled_turn_returns_cancelled() {
        let engine = engine_with(MockProvider::new().with_response("never sent"));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = engine
            .run_turn(vec![Message::user("Hi")], tx, cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, SkyError::TurnCancelled));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancel_mid_stream() {
        let provider = MockProvider::new()
            .with_response("a long answer that streams in several fragments over time")
            .with_chunk_delay(std::time::Duration::from_millis(20));
        let engine = engine_with(provider);
        let (tx, _rx) = mpsc::unbounded_channel();

        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let err = engine
            .run_turn(vec![Message::user("Hi")], tx, cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, SkyError::TurnCancelled));
    }

    #[tokio::test]
    async fn test_cancel_after_tool_round_discards_exchange() {
        let provider = MockProvider::new()
            .with_sequence(vec![
                MockResponse::tool_call(
                    "get_flight_status",
                    serde_json::json!({"flight_number": "AA123"}),
                ),
                MockResponse::text("a final answer that streams slowly enough to be cancelled"),
            ])
            .with_chunk_delay(std::time::Duration::from_millis(20));
        let engine = engine_with(provider);
        let (tx, _rx) = mpsc::unbounded_channel();

        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            // Lands after the tool round, during the second stream
            tokio::time::sleep(std::time::Duration::from_millis(150)).await;
            canceller.cancel();
        });

        let err = engine
            .run_turn(vec![Message::user("Where is AA123?")], tx, cancel)
            .await
            .unwrap_err();

        // The executed tool exchange is discarded with the turn
        assert!(matches!(err, SkyError::TurnCancelled));
    }

    #[tokio::test]
    async fn test_tool_round_preamble_kept_with_exchange() {
        use crate::llm::mock_provider::MockToolCall;

        let provider = MockProvider::new().with_sequence(vec![
            MockResponse {
                text: "Let me check that flight.".to_string(),
                tool_calls: vec![MockToolCall {
                    id: "call_1".to_string(),
                    name: "get_flight_status".to_string(),
                    input: serde_json::json!({"flight_number": "AA123"}),
                }],
                stop_reason: StopReason::ToolUse,
                ..MockResponse::default()
            },
            MockResponse::text("AA123 is on time."),
        ]);
        let engine = engine_with(provider);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let turn = engine
            .run_turn(
                vec![Message::user("Where is AA123?")],
                tx,
                CancellationToken::new(),
            )
            .await
            .unwrap();

        // Text streamed before the tool call travels with the exchange,
        // so later rounds see the assistant's preamble
        assert_eq!(turn.messages.len(), 2);
        assert_eq!(turn.messages[0].role, Role::Tool);
        assert_eq!(turn.messages[0].text(), Some("Let me check that flight."));
        assert_eq!(turn.messages[0].tool_uses().len(), 1);

        // The answer still concatenates every fragment across rounds
        assert_eq!(turn.answer, "Let me check that flight.AA123 is on time.");
        assert_eq!(collect_fragments(&mut rx), turn.answer);
    }

    #[tokio::test]
    async fn test_tool_round_limit() {
        // Model that always wants another tool call
        let provider = MockProvider::new().with_tool_call(
            "get_flight_status",
            serde_json::json!({"flight_number": "AA123"}),
        );
        let engine = engine_with(provider);
        let (tx, _rx) = mpsc::unbounded_channel();

        let turn = engine
            .run_turn(
                vec![Message::user("loop forever")],
                tx,
                CancellationToken::new(),
            )
            .await
            .unwrap();

        // max_tool_rounds exchanges plus a final (empty) assistant message
        assert_eq!(
            turn.messages.len(),
            EngineConfig::default().max_tool_rounds + 1
        );
        assert_eq!(
            turn.messages.last().unwrap().role,
            Role::Assistant
        );
    }

    #[tokio::test]
    async fn test_invalid_tool_request_fed_back_not_fatal() {
        let provider = MockProvider::new().with_sequence(vec![
            MockResponse::tool_call("get_flight_status", serde_json::json!({})),
            MockResponse::text("Could you give me the flight number?"),
        ]);
        let engine = engine_with(provider);
        let (tx, _rx) = mpsc::unbounded_channel();

        let turn = engine
            .run_turn(
                vec![Message::user("flight status please")],
                tx,
                CancellationToken::new(),
            )
            .await
            .unwrap();

        // The bad request became an error tool result, not a failure
        assert_eq!(turn.messages.len(), 2);
        assert!(turn.answer.contains("flight number"));
    }
}
