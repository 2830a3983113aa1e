//! Bot API update payloads and their conversion into pipeline events.
//!
//! Only the fields the bot reads are modelled; serde ignores the rest.

use super::traits::{CallbackId, ChatId, MessageRef, UserId};
use crate::moderation::pipeline::InboundEvent;
use crate::moderation::types::{DecisionEvent, Submission, Submitter};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

/// Button press. `message` is absent for presses on inline-mode messages and
/// may be an inaccessible stub; either way only chat and id are read.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<CallbackMessage>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackMessage {
    pub message_id: i64,
    pub chat: Chat,
}

impl Message {
    fn reference(&self) -> MessageRef {
        MessageRef {
            chat_id: ChatId(self.chat.id),
            message_id: self.message_id,
        }
    }

    fn is_private(&self) -> bool {
        self.chat.kind == "private"
    }
}

fn is_greeting_command(text: &str) -> bool {
    let command = text.split_whitespace().next().unwrap_or("");
    // "/start@my_bot" is how commands look when the bot is mentioned.
    let command = command.split('@').next().unwrap_or("");
    matches!(command, "/start" | "/help")
}

impl Update {
    /// Convert into a pipeline event, or `None` for updates the bot ignores
    /// (group chatter, messages from bots, edits and other update kinds).
    pub fn into_event(self) -> Option<InboundEvent> {
        if let Some(query) = self.callback_query {
            return Some(InboundEvent::Decision(DecisionEvent {
                actor: UserId(query.from.id),
                token: query.data.unwrap_or_default(),
                callback: CallbackId(query.id),
                view: query.message.map(|m| MessageRef {
                    chat_id: ChatId(m.chat.id),
                    message_id: m.message_id,
                }),
            }));
        }

        let message = self.message?;
        if !message.is_private() {
            return None;
        }
        let from = message.from.as_ref()?;
        if from.is_bot {
            return None;
        }

        if message.text.as_deref().is_some_and(is_greeting_command) {
            return Some(InboundEvent::Start {
                chat: message.reference(),
            });
        }

        let submitter = Submitter {
            id: UserId(from.id),
            display_name: Some(from.full_name()),
        };
        let origin = message.reference();
        Some(InboundEvent::Submission(Submission {
            submitter,
            origin,
            preview: message.text.or(message.caption),
        }))
    }
}
