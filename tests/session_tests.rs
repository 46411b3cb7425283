// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::sync::Arc;
use std::time::Duration;

use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sky::booking::BookingDirectory;
use sky::chat::{
    ConversationEngine, Outbound, SessionManager, Submission, TurnStatus, PAUSE_TOKEN,
};
use sky::config::{ConversationConfig, EngineConfig, FlightDataConfig};
use sky::flightdata::FlightDataFacade;
use sky::llm::message::Role;
use sky::llm::mock_provider::{MockProvider, MockResponse};
use sky::tools::ToolRouter;
use sky::SkyError;

fn manager_with(provider: MockProvider) -> Arc<SessionManager> {
    let tools = Arc::new(ToolRouter::new(
        Arc::new(FlightDataFacade::fallback_only()),
        Arc::new(BookingDirectory::new()),
    ));
    manager_with_router(provider, tools)
}

fn manager_with_router(provider: MockProvider, tools: Arc<ToolRouter>) -> Arc<SessionManager> {
    let engine = Arc::new(ConversationEngine::new(
        Arc::new(provider),
        tools,
        "mock-model",
        EngineConfig::default(),
    ));
    Arc::new(SessionManager::new(engine, ConversationConfig::default()))
}

/// Collect frames until the first terminal marker, inclusive.
async fn collect_turn(rx: &mut UnboundedReceiverStream<Outbound>) -> Vec<Outbound> {
    let mut frames = Vec::new();
    while let Some(frame) = rx.next().await {
        let done = frame.is_terminal();
        frames.push(frame);
        if done {
            break;
        }
    }
    frames
}

fn fragment_text(frames: &[Outbound]) -> String {
    frames
        .iter()
        .filter_map(|f| match f {
            Outbound::Fragment { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_fragments_concatenate_to_stored_answer() {
    let manager = manager_with(
        MockProvider::new().with_response("Your flight AA123 is on time, departing at 08:00."),
    );
    let (id, mut rx) = manager.open_session().await;

    let submission = manager.handle_message(id, "Where is AA123?").await.unwrap();
    assert_eq!(submission, Submission::TurnStarted);

    let frames = collect_turn(&mut rx).await;

    // All fragments precede the single terminal marker
    let terminals: Vec<_> = frames.iter().filter(|f| f.is_terminal()).collect();
    assert_eq!(terminals.len(), 1);
    assert!(frames.last().unwrap().is_terminal());
    assert!(matches!(
        frames.last().unwrap(),
        Outbound::Terminal {
            status: TurnStatus::Completed,
            ..
        }
    ));

    // Concatenated fragments equal the assistant message in history
    let history = manager.history(id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(fragment_text(&frames), history[1].text().unwrap());
}

#[tokio::test]
async fn test_busy_session_rejects_second_message() {
    let provider = MockProvider::new()
        .with_response("a slow answer streamed one small piece at a time")
        .with_chunk_delay(Duration::from_millis(25));
    let manager = manager_with(provider);
    let (id, mut rx) = manager.open_session().await;

    manager.handle_message(id, "first question").await.unwrap();

    // Wait until a fragment proves the turn is running
    let first = rx.next().await.unwrap();
    assert!(matches!(first, Outbound::Fragment { .. }));

    let err = manager
        .handle_message(id, "second question")
        .await
        .unwrap_err();
    assert!(matches!(err, SkyError::SessionBusy(_)));

    // The rejected message left no trace; the first turn completes
    let mut frames = vec![first];
    frames.extend(collect_turn(&mut rx).await);
    assert!(matches!(
        frames.last().unwrap(),
        Outbound::Terminal {
            status: TurnStatus::Completed,
            ..
        }
    ));

    let history = manager.history(id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].text(), Some("first question"));
}

#[tokio::test]
async fn test_pause_cancels_active_turn() {
    let provider = MockProvider::new()
        .with_response("this response takes long enough to be paused midway through")
        .with_chunk_delay(Duration::from_millis(25));
    let manager = manager_with(provider);
    let (id, mut rx) = manager.open_session().await;

    manager.handle_message(id, "tell me everything").await.unwrap();

    // Let it start streaming, then pause
    let first = rx.next().await.unwrap();
    assert!(matches!(first, Outbound::Fragment { .. }));

    let submission = manager.handle_message(id, PAUSE_TOKEN).await.unwrap();
    assert_eq!(submission, Submission::PauseSignalled);

    let mut frames = vec![first];
    frames.extend(collect_turn(&mut rx).await);
    assert!(matches!(
        frames.last().unwrap(),
        Outbound::Terminal {
            status: TurnStatus::Cancelled,
            ..
        }
    ));

    // The user message is retained; the partial answer is not
    let history = manager.history(id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[0].text(), Some("tell me everything"));

    // Session is free again
    assert!(!manager.is_busy(id).await.unwrap());
    let submission = manager.handle_message(id, "shorter please").await.unwrap();
    assert_eq!(submission, Submission::TurnStarted);
}

#[tokio::test]
async fn test_pause_during_pending_tool_call() {
    // A slow flight-data backend keeps the tool call in flight long
    // enough for the pause to land while it is pending
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/flights"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"data": []}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let config = FlightDataConfig {
        base_url: format!("{}/v1/flights", server.uri()),
        timeout_secs: 5,
        ..Default::default()
    };
    let tools = Arc::new(ToolRouter::new(
        Arc::new(FlightDataFacade::new(Some("test-key".to_string()), &config)),
        Arc::new(BookingDirectory::new()),
    ));
    let provider = MockProvider::new().with_sequence(vec![
        MockResponse::tool_call(
            "get_flight_status",
            serde_json::json!({"flight_number": "AA123"}),
        ),
        MockResponse::text("never delivered"),
    ]);
    let manager = manager_with_router(provider, tools);
    let (id, mut rx) = manager.open_session().await;

    manager.handle_message(id, "Where is AA123?").await.unwrap();

    // The stream finishes immediately, so by now the turn is waiting
    // on the tool call
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(
        manager.handle_message(id, PAUSE_TOKEN).await.unwrap(),
        Submission::PauseSignalled
    );

    let frames = collect_turn(&mut rx).await;
    assert!(matches!(
        frames.last().unwrap(),
        Outbound::Terminal {
            status: TurnStatus::Cancelled,
            ..
        }
    ));

    // The abandoned tool call left no exchange behind
    let history = manager.history(id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, Role::User);
    assert!(!manager.is_busy(id).await.unwrap());
}

#[tokio::test]
async fn test_repeated_pause_is_idempotent() {
    let provider = MockProvider::new()
        .with_response("pausing twice should behave the same as pausing once")
        .with_chunk_delay(Duration::from_millis(25));
    let manager = manager_with(provider);
    let (id, mut rx) = manager.open_session().await;

    manager.handle_message(id, "go").await.unwrap();
    let first = rx.next().await.unwrap();
    assert!(matches!(first, Outbound::Fragment { .. }));

    assert_eq!(
        manager.handle_message(id, PAUSE_TOKEN).await.unwrap(),
        Submission::PauseSignalled
    );

    let mut frames = vec![first];
    frames.extend(collect_turn(&mut rx).await);
    let terminals = frames.iter().filter(|f| f.is_terminal()).count();
    assert_eq!(terminals, 1);

    // A second pause after the turn ended is a no-op, not an error
    assert_eq!(
        manager.handle_message(id, PAUSE_TOKEN).await.unwrap(),
        Submission::PauseIgnored
    );
}

#[tokio::test]
async fn test_tool_turn_history_shape() {
    let provider = MockProvider::new().with_sequence(vec![
        MockResponse::tool_call(
            "get_flight_status",
            serde_json::json!({"flight_number": "AA123"}),
        ),
        MockResponse::text("AA123 departs JFK at 08:00 and is currently on time."),
    ]);
    let manager = manager_with(provider);
    let (id, mut rx) = manager.open_session().await;

    manager.handle_message(id, "Where is AA123?").await.unwrap();
    let frames = collect_turn(&mut rx).await;

    assert!(matches!(
        frames.last().unwrap(),
        Outbound::Terminal {
            status: TurnStatus::Completed,
            ..
        }
    ));

    // user, tool exchange, assistant
    let history = manager.history(id).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].role, Role::User);
    assert_eq!(history[1].role, Role::Tool);
    assert_eq!(history[2].role, Role::Assistant);

    // The exchange pairs the call with its result
    assert_eq!(history[1].tool_uses().len(), 1);
    assert_eq!(fragment_text(&frames), history[2].text().unwrap());
}

#[tokio::test]
async fn test_multiple_sessions_are_independent() {
    let provider = MockProvider::new().with_sequence(vec![
        MockResponse::text("answer for the first session"),
        MockResponse::text("answer for the second session"),
    ]);
    let manager = manager_with(provider);

    let (a, mut rx_a) = manager.open_session().await;
    let (b, mut rx_b) = manager.open_session().await;
    assert_eq!(manager.session_count().await, 2);

    manager.handle_message(a, "hello from a").await.unwrap();
    collect_turn(&mut rx_a).await;

    manager.handle_message(b, "hello from b").await.unwrap();
    collect_turn(&mut rx_b).await;

    let history_a = manager.history(a).await.unwrap();
    let history_b = manager.history(b).await.unwrap();
    assert_eq!(history_a.len(), 2);
    assert_eq!(history_b.len(), 2);
    assert_eq!(history_a[0].text(), Some("hello from a"));
    assert_eq!(history_b[0].text(), Some("hello from b"));
}

#[tokio::test]
async fn test_failed_turn_sends_failed_terminal() {
    let manager = manager_with(MockProvider::new().with_stream_error("upstream unavailable"));
    let (id, mut rx) = manager.open_session().await;

    manager.handle_message(id, "hello?").await.unwrap();
    let frames = collect_turn(&mut rx).await;

    assert_eq!(frames.len(), 1);
    assert!(matches!(
        frames.last().unwrap(),
        Outbound::Terminal {
            status: TurnStatus::Failed,
            ..
        }
    ));

    // Only the user message survives a failed turn
    let history = manager.history(id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, Role::User);
    assert!(!manager.is_busy(id).await.unwrap());
}
