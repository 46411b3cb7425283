// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Session management
//!
//! Each connected client gets a session holding its conversation
//! history and outbound channel. A session runs at most one turn at a
//! time: new messages during an active turn are rejected as busy, and
//! the pause token cancels the active turn instead of starting one.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::chat::dispatcher::TurnDispatcher;
use crate::chat::engine::{ConversationEngine, SYSTEM_PROMPT};
use crate::chat::transport::Outbound;
use crate::config::ConversationConfig;
use crate::error::{Result, SkyError};
use crate::llm::message::{Conversation, Message};

/// In-band control token that pauses the active turn
pub const PAUSE_TOKEN: &str = "__PAUSE__";

/// Session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What happened to an inbound message
#[derive(Debug, PartialEq, Eq)]
pub enum Submission {
    /// A new turn was started
    TurnStarted,
    /// The active turn was signalled to stop
    PauseSignalled,
    /// Pause received with no active turn; nothing to do
    PauseIgnored,
}

/// A running turn
struct ActiveTurn {
    cancel: CancellationToken,
}

/// Per-client state
pub(crate) struct Session {
    pub(crate) history: Conversation,
    pub(crate) outbound: mpsc::UnboundedSender<Outbound>,
    active: Option<ActiveTurn>,
}

/// Owns all sessions and routes inbound messages
pub struct SessionManager {
    sessions: Mutex<HashMap<SessionId, Session>>,
    engine: Arc<ConversationEngine>,
    conversation_config: ConversationConfig,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(engine: Arc<ConversationEngine>, conversation_config: ConversationConfig) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            engine,
            conversation_config,
        }
    }

    /// Open a new session, returning its ID and the stream of outbound
    /// frames for the client
    pub async fn open_session(&self) -> (SessionId, UnboundedReceiverStream<Outbound>) {
        let id = SessionId::new();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut history = Conversation::with_config(self.conversation_config.clone());
        history.set_system(SYSTEM_PROMPT);

        let session = Session {
            history,
            outbound: tx,
            active: None,
        };

        self.sessions.lock().await.insert(id, session);
        tracing::info!(session = %id, "session opened");

        (id, UnboundedReceiverStream::new(rx))
    }

    /// Handle one inbound client message
    pub async fn handle_message(
        self: &Arc<Self>,
        id: SessionId,
        text: &str,
    ) -> Result<Submission> {
        if text == PAUSE_TOKEN {
            return self.pause(id).await;
        }

        let (snapshot, cancel, outbound) = {
            let mut sessions = self.sessions.lock().await;
            let session = sessions.get_mut(&id).ok_or(SkyError::UnknownSession(id.0))?;

            if session.active.is_some() {
                return Err(SkyError::SessionBusy(id.0));
            }

            // The user message is kept even if the turn is later cancelled
            session.history.push(Message::user(text));
            let max_tokens = self.conversation_config.max_context_tokens;
            let trimmed = session.history.trim_to_fit(max_tokens);
            if trimmed > 0 {
                tracing::debug!(session = %id, trimmed, "evicted oldest history messages");
            }

            let cancel = CancellationToken::new();
            session.active = Some(ActiveTurn {
                cancel: cancel.clone(),
            });

            (
                session.history.messages.clone(),
                cancel,
                session.outbound.clone(),
            )
        };

        let dispatcher = TurnDispatcher::new(
            Arc::clone(&self.engine),
            Arc::clone(self),
            id,
            outbound,
            cancel,
        );
        tokio::spawn(dispatcher.run(snapshot));

        Ok(Submission::TurnStarted)
    }

    /// Signal the active turn to stop. A pause with no active turn is a
    /// no-op, so repeated pauses are harmless.
    async fn pause(self: &Arc<Self>, id: SessionId) -> Result<Submission> {
        let sessions = self.sessions.lock().await;
        let session = sessions.get(&id).ok_or(SkyError::UnknownSession(id.0))?;

        match &session.active {
            Some(turn) => {
                tracing::info!(session = %id, "pause requested, cancelling turn");
                turn.cancel.cancel();
                Ok(Submission::PauseSignalled)
            }
            None => {
                tracing::debug!(session = %id, "pause with no active turn ignored");
                Ok(Submission::PauseIgnored)
            }
        }
    }

    /// Record a finished turn: append its messages, clear the active
    /// slot, and hand back the outbound sender for the terminal marker.
    pub(crate) async fn finish_turn(
        &self,
        id: SessionId,
        new_messages: Vec<Message>,
    ) -> Option<mpsc::UnboundedSender<Outbound>> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&id)?;

        for message in new_messages {
            session.history.push(message);
        }
        session
            .history
            .trim_to_fit(self.conversation_config.max_context_tokens);
        session.active = None;

        Some(session.outbound.clone())
    }

    /// Close a session, cancelling any active turn
    pub async fn close_session(&self, id: SessionId) {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.remove(&id) {
            if let Some(turn) = session.active {
                turn.cancel.cancel();
            }
            tracing::info!(session = %id, "session closed");
        }
    }

    /// Number of open sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Snapshot of a session's history, for inspection
    pub async fn history(&self, id: SessionId) -> Result<Vec<Message>> {
        let sessions = self.sessions.lock().await;
        let session = sessions.get(&id).ok_or(SkyError::UnknownSession(id.0))?;
        Ok(session.history.messages.clone())
    }

    /// Whether the session currently has an active turn
    pub async fn is_busy(&self, id: SessionId) -> Result<bool> {
        let sessions = self.sessions.lock().await;
        let session = sessions.get(&id).ok_or(SkyError::UnknownSession(id.0))?;
        Ok(session.active.is_some())
    }
}
