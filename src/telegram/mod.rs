//! Telegram transport
//!
//! [`ChatTransport`] is the seam between the moderation core and the chat
//! network. [`TelegramClient`] speaks the Bot API; [`MockTransport`] records
//! calls in memory for tests.

pub mod client;
pub mod mock;
pub mod retry;
pub mod traits;
pub mod updates;

pub use client::{TelegramClient, DEFAULT_API_URL};
pub use mock::{MockTransport, Sent};
pub use retry::{retry_with_backoff_if, RetryPolicy};
pub use traits::{
    CallbackId, ChatId, ChatRef, ChatTransport, MessageRef, TransportError, TransportResult,
    UserId,
};
pub use updates::Update;
