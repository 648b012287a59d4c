//! Client for the remote conversational backend

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the conversation history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("failed to reach chat backend: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("chat backend returned {status}: {detail}")]
    Backend { status: u16, detail: String },
    #[error("chat backend response has no reply")]
    MissingReply,
    #[error("conversation history unavailable: {0}")]
    History(String),
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct ChatReply {
    reply: Option<String>,
    /// Accepted when `reply` is absent
    message: Option<String>,
}

#[derive(Deserialize)]
struct BackendError {
    error: Option<String>,
}

/// HTTP client posting the full history to the chat backend
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ChatClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send the conversation and return the assistant's reply
    pub async fn send(&self, history: &[Message]) -> Result<Message, ChatError> {
        debug!("Sending {} messages to {}", history.len(), self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest { messages: history })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<BackendError>()
                .await
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(ChatError::Backend {
                status: status.as_u16(),
                detail,
            });
        }

        let body: ChatReply = response.json().await?;
        let reply = body.reply.or(body.message).ok_or(ChatError::MissingReply)?;
        info!("Received {} byte reply from chat backend", reply.len());
        Ok(Message::assistant(reply))
    }
}
