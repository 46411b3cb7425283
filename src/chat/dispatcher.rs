// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Turn dispatcher
//!
//! Runs one turn to completion: forwards fragments from the engine to
//! the client as they arrive, then drains whatever is still buffered
//! and sends exactly one terminal marker. The session's active slot is
//! cleared before the terminal goes out, so the client can submit again
//! the moment it sees the marker.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::chat::engine::ConversationEngine;
use crate::chat::session::{SessionId, SessionManager};
use crate::chat::transport::Outbound;
use crate::error::SkyError;
use crate::llm::message::Message;

/// Drives one spawned turn for a session
pub(crate) struct TurnDispatcher {
    engine: Arc<ConversationEngine>,
    manager: Arc<SessionManager>,
    session_id: SessionId,
    outbound: mpsc::UnboundedSender<Outbound>,
    cancel: CancellationToken,
}

impl TurnDispatcher {
    pub(crate) fn new(
        engine: Arc<ConversationEngine>,
        manager: Arc<SessionManager>,
        session_id: SessionId,
        outbound: mpsc::UnboundedSender<Outbound>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            engine,
            manager,
            session_id,
            outbound,
            cancel,
        }
    }

    /// Run the turn over the given history snapshot
    pub(crate) async fn run(self, snapshot: Vec<Message>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        let engine_fut = self
            .engine
            .run_turn(snapshot, tx, self.cancel.clone());
        tokio::pin!(engine_fut);

        // Forward fragments while the engine runs
        let result = loop {
            tokio::select! {
                result = &mut engine_fut => break result,
                Some(text) = rx.recv() => {
                    let _ = self.outbound.send(Outbound::fragment(text));
                }
            }
        };

        // The engine dropped its sender; drain what's still buffered so
        // every fragment precedes the terminal marker
        while let Ok(text) = rx.try_recv() {
            let _ = self.outbound.send(Outbound::fragment(text));
        }

        let (new_messages, terminal) = match result {
            Ok(turn) => (turn.messages, Outbound::completed()),
            Err(SkyError::TurnCancelled) => {
                tracing::info!(session = %self.session_id, "turn cancelled");
                (vec![], Outbound::cancelled())
            }
            Err(e) => {
                tracing::error!(session = %self.session_id, error = %e, "turn failed");
                (vec![], Outbound::failed("Sorry, something went wrong."))
            }
        };

        // Clear the active slot (and append history) before the client
        // sees the terminal marker
        if let Some(outbound) = self
            .manager
            .finish_turn(self.session_id, new_messages)
            .await
        {
            let _ = outbound.send(terminal);
        }
    }
}
