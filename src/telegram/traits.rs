//! Chat Transport Trait Abstractions
//!
//! The moderation core talks to the chat network only through [`ChatTransport`].
//! `TelegramClient` implements it against the Bot API; `MockTransport` records
//! every call so the pipeline can be tested without a network.

use crate::moderation::types::{Ack, ReviewRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Telegram user identifier. In private chats it doubles as the chat id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Telegram chat identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub i64);

impl From<UserId> for ChatId {
    fn from(user: UserId) -> Self {
        ChatId(user.0)
    }
}

/// Chat addressed either by numeric id or by public `@username`.
///
/// Serializes untagged, which is exactly the shape the Bot API accepts for
/// `chat_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatRef {
    Id(i64),
    Username(String),
}

impl fmt::Display for ChatRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRef::Id(id) => write!(f, "{}", id),
            ChatRef::Username(name) => write!(f, "{}", name),
        }
    }
}

/// Location of a message: enough to forward, copy, reply to or edit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: i64,
}

/// Identifier of a button press, used to answer it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallbackId(pub String);

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Telegram API error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("Rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("Decode error: {0}")]
    Decode(String),
}

impl TransportError {
    /// Transient failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Network(_) | TransportError::RateLimited { .. }
        )
    }

    /// Failures after which the request is known not to have run.
    ///
    /// Only a rate-limit refusal qualifies. A network error may follow a
    /// request the server already executed.
    pub fn is_safe_to_repeat(&self) -> bool {
        matches!(self, TransportError::RateLimited { .. })
    }

    /// Server-mandated wait before the next attempt, if any.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            TransportError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

// Request URLs embed the bot token, so they are stripped from messages.
impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Decode(err.to_string())
    }
}

/// Outbound side of the chat network, as consumed by the moderation core.
///
/// Implementations must be cheap to clone; every handler keeps its own copy.
#[async_trait]
pub trait ChatTransport: Clone + Send + Sync + 'static {
    /// Republish the referenced message to the public outlet.
    async fn publish(&self, outlet: &ChatRef, origin: &MessageRef) -> TransportResult<()>;

    /// Send a plain text notification to a user.
    async fn notify(&self, recipient: UserId, text: &str) -> TransportResult<()>;

    /// Forward the original submission to a moderator.
    async fn forward(&self, to: UserId, origin: &MessageRef) -> TransportResult<()>;

    /// Send a review request with its approve/reject buttons to a moderator.
    async fn send_review(&self, to: UserId, request: &ReviewRequest) -> TransportResult<()>;

    /// Reply to a message in its own chat.
    async fn reply(&self, to: &MessageRef, text: &str) -> TransportResult<()>;

    /// Answer a button press. An empty ack text just stops the client spinner.
    async fn answer_callback(&self, callback: &CallbackId, ack: &Ack) -> TransportResult<()>;

    /// Replace the text of a moderator-facing view (drops its buttons).
    async fn edit_view(&self, view: &MessageRef, text: &str) -> TransportResult<()>;
}
