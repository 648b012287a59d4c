//! Main application state management

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Instant,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{Session, TimerEngine, TimerSnapshot};
use crate::{
    services::{ChatClient, ChatError, Message},
    utils::format_uptime,
};

/// Shown to the user when the chat backend cannot be reached
pub const FALLBACK_REPLY: &str = "Oops! I'm having trouble connecting to my assistant right now. \
    Please ensure the chat backend is running.";

/// Sent to the assistant when a countdown finishes
pub const SESSION_COMPLETE_PROMPT: &str =
    "My timer just finished. What should I do next, or how can I maintain my focus?";

/// Result of one chat exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatOutcome {
    pub reply: String,
    /// True when `reply` is the local fallback rather than the backend's answer
    pub fallback: bool,
}

/// Main application state: the countdown engine plus the chat proxy
#[derive(Debug)]
pub struct AppState {
    /// The single countdown engine
    pub timer: TimerEngine,
    /// Chat backend client and the conversation sent with every request
    pub chat: ChatClient,
    pub history: Arc<Mutex<Vec<Message>>>,
    /// Held for the whole of one exchange so each reply follows its own question
    pub exchange_guard: tokio::sync::Mutex<()>,
    /// Ask the assistant for advice whenever a session completes
    pub notify_assistant: bool,
    /// Countdowns that reached zero since startup
    pub completed_sessions: AtomicU64,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// Last action tracking
    pub last_action: Arc<Mutex<Option<String>>>,
    pub last_action_time: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl AppState {
    pub fn new(
        timer: TimerEngine,
        chat: ChatClient,
        notify_assistant: bool,
        port: u16,
        host: String,
    ) -> Self {
        Self {
            timer,
            chat,
            history: Arc::new(Mutex::new(Vec::new())),
            exchange_guard: tokio::sync::Mutex::new(()),
            notify_assistant,
            completed_sessions: AtomicU64::new(0),
            start_time: Instant::now(),
            port,
            host,
            last_action: Arc::new(Mutex::new(None)),
            last_action_time: Arc::new(Mutex::new(None)),
        }
    }

    fn record_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }

    /// Select a session, cancelling any running countdown
    pub fn select_session(&self, session: Session) -> TimerSnapshot {
        self.record_action(&format!("select-{}", session));
        self.timer.select_session(session)
    }

    /// Start the countdown; a second start while running is ignored
    pub fn start_timer(&self) -> (bool, TimerSnapshot) {
        let started = self.timer.start();
        if started {
            self.record_action("start");
        }
        (started, self.timer.snapshot())
    }

    /// Stop and reset the countdown
    pub fn stop_timer(&self) -> TimerSnapshot {
        self.record_action("stop");
        self.timer.stop();
        self.timer.snapshot()
    }

    /// Get a copy of the conversation history
    pub fn get_history(&self) -> Result<Vec<Message>, String> {
        self.history.lock()
            .map(|history| history.clone())
            .map_err(|e| format!("Failed to lock chat history: {}", e))
    }

    /// Append a message to the conversation history
    pub fn push_message(&self, message: Message) -> Result<(), String> {
        let mut history = self.history.lock()
            .map_err(|e| format!("Failed to lock chat history: {}", e))?;
        history.push(message);
        Ok(())
    }

    /// Record `message`, send the whole conversation, and record the reply.
    ///
    /// On failure `message` is removed again so user and assistant turns
    /// keep alternating.
    async fn exchange(&self, message: Message) -> Result<Message, ChatError> {
        let _turn = self.exchange_guard.lock().await;

        let snapshot = {
            let mut history = self.history.lock()
                .map_err(|e| ChatError::History(format!("Failed to lock chat history: {}", e)))?;
            history.push(message);
            history.clone()
        };

        match self.chat.send(&snapshot).await {
            Ok(reply) => {
                self.push_message(reply.clone()).map_err(ChatError::History)?;
                Ok(reply)
            }
            Err(e) => {
                if let Ok(mut history) = self.history.lock() {
                    if history.len() == snapshot.len() {
                        history.pop();
                    }
                }
                Err(e)
            }
        }
    }

    /// Handle one user chat message.
    ///
    /// Backend failures are answered with `FALLBACK_REPLY`; neither the
    /// fallback nor the unanswered message is kept in the history.
    pub async fn chat(&self, text: &str) -> Result<ChatOutcome, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.record_action("chat");

        match self.exchange(Message::user(text)).await {
            Ok(reply) => Ok(ChatOutcome {
                reply: reply.content,
                fallback: false,
            }),
            Err(ChatError::History(e)) => Err(ChatError::History(e)),
            Err(e) => {
                warn!("Chat backend request failed: {}", e);
                Ok(ChatOutcome {
                    reply: FALLBACK_REPLY.to_string(),
                    fallback: true,
                })
            }
        }
    }

    /// Tell the assistant that `session` finished and record its advice
    pub async fn notify_session_completed(&self, session: Session) -> Result<Message, ChatError> {
        info!("Notifying assistant that the {} session completed", session);
        self.exchange(Message::user(SESSION_COMPLETE_PROMPT)).await
    }

    /// Count a completed session, returning the new total
    pub fn record_completion(&self) -> u64 {
        self.completed_sessions.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get_completed_sessions(&self) -> u64 {
        self.completed_sessions.load(Ordering::Relaxed)
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        format_uptime(self.start_time.elapsed())
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }
}
