//! Mock transport for testing
//!
//! Records every outbound call and lets tests make individual operations fail.

use super::traits::*;
use crate::moderation::types::{Ack, ReviewRequest};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock chat transport for testing
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    sent: Vec<Sent>,
    fail_publish: bool,
    fail_notify: bool,
    fail_reply: bool,
    fail_answer: bool,
    fail_edit: bool,
    unreachable: HashSet<UserId>,
    publish_errors: VecDeque<PublishError>,
    publish_delay: Duration,
}

/// A scripted failure for the next publish call.
struct PublishError {
    error: TransportError,
    /// The copy reached the outlet before the error was reported.
    delivered: bool,
}

/// One recorded outbound call.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Published { outlet: ChatRef, origin: MessageRef },
    Notified { recipient: UserId, text: String },
    Forwarded { to: UserId, origin: MessageRef },
    Review { to: UserId, request: ReviewRequest },
    Reply { to: MessageRef, text: String },
    Answered { callback: CallbackId, ack: Ack },
    Edited { view: MessageRef, text: String },
}

fn offline(what: &str) -> TransportError {
    TransportError::Api {
        code: 403,
        description: format!("mock: {} disabled", what),
    }
}

impl MockTransport {
    /// Create new mock transport
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded calls, in order.
    pub fn sent(&self) -> Vec<Sent> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn published(&self) -> Vec<MessageRef> {
        self.filter(|s| match s {
            Sent::Published { origin, .. } => Some(*origin),
            _ => None,
        })
    }

    /// Notifications sent to a given user.
    pub fn notifications_to(&self, user: UserId) -> Vec<String> {
        self.filter(|s| match s {
            Sent::Notified { recipient, text } if *recipient == user => Some(text.clone()),
            _ => None,
        })
    }

    pub fn reviews(&self) -> Vec<(UserId, ReviewRequest)> {
        self.filter(|s| match s {
            Sent::Review { to, request } => Some((*to, request.clone())),
            _ => None,
        })
    }

    pub fn forwards(&self) -> Vec<(UserId, MessageRef)> {
        self.filter(|s| match s {
            Sent::Forwarded { to, origin } => Some((*to, *origin)),
            _ => None,
        })
    }

    pub fn replies(&self) -> Vec<(MessageRef, String)> {
        self.filter(|s| match s {
            Sent::Reply { to, text } => Some((*to, text.clone())),
            _ => None,
        })
    }

    pub fn answers(&self) -> Vec<(CallbackId, Ack)> {
        self.filter(|s| match s {
            Sent::Answered { callback, ack } => Some((callback.clone(), ack.clone())),
            _ => None,
        })
    }

    pub fn edits(&self) -> Vec<(MessageRef, String)> {
        self.filter(|s| match s {
            Sent::Edited { view, text } => Some((*view, text.clone())),
            _ => None,
        })
    }

    pub fn set_fail_publish(&self, fail: bool) {
        self.state.lock().unwrap().fail_publish = fail;
    }

    pub fn set_fail_notify(&self, fail: bool) {
        self.state.lock().unwrap().fail_notify = fail;
    }

    pub fn set_fail_reply(&self, fail: bool) {
        self.state.lock().unwrap().fail_reply = fail;
    }

    pub fn set_fail_answer(&self, fail: bool) {
        self.state.lock().unwrap().fail_answer = fail;
    }

    pub fn set_fail_edit(&self, fail: bool) {
        self.state.lock().unwrap().fail_edit = fail;
    }

    /// Fail the next publish call with `error`. When `delivered` is set the
    /// copy is still recorded, as when a reply is lost after the server ran
    /// the request.
    pub fn fail_next_publish(&self, error: TransportError, delivered: bool) {
        self.state
            .lock()
            .unwrap()
            .publish_errors
            .push_back(PublishError { error, delivered });
    }

    /// Hold every publish call for `delay` before it takes effect.
    pub fn set_publish_delay(&self, delay: Duration) {
        self.state.lock().unwrap().publish_delay = delay;
    }

    /// Make forwards and review requests to `user` fail (e.g. bot blocked).
    pub fn set_unreachable(&self, user: UserId) {
        self.state.lock().unwrap().unreachable.insert(user);
    }

    /// Clear all state
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        *state = MockState::default();
    }

    fn filter<R>(&self, f: impl Fn(&Sent) -> Option<R>) -> Vec<R> {
        self.state.lock().unwrap().sent.iter().filter_map(f).collect()
    }

    fn record(&self, sent: Sent, failing: impl Fn(&MockState) -> bool, what: &str) -> TransportResult<()> {
        let mut state = self.state.lock().unwrap();
        if failing(&state) {
            return Err(offline(what));
        }
        state.sent.push(sent);
        Ok(())
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn publish(&self, outlet: &ChatRef, origin: &MessageRef) -> TransportResult<()> {
        let delay = self.state.lock().unwrap().publish_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.state.lock().unwrap().publish_errors.pop_front();
        if let Some(PublishError { error, delivered }) = scripted {
            if delivered {
                self.state.lock().unwrap().sent.push(Sent::Published {
                    outlet: outlet.clone(),
                    origin: *origin,
                });
            }
            return Err(error);
        }

        self.record(
            Sent::Published {
                outlet: outlet.clone(),
                origin: *origin,
            },
            |s| s.fail_publish,
            "publish",
        )
    }

    async fn notify(&self, recipient: UserId, text: &str) -> TransportResult<()> {
        self.record(
            Sent::Notified {
                recipient,
                text: text.to_string(),
            },
            |s| s.fail_notify,
            "notify",
        )
    }

    async fn forward(&self, to: UserId, origin: &MessageRef) -> TransportResult<()> {
        self.record(
            Sent::Forwarded {
                to,
                origin: *origin,
            },
            |s| s.unreachable.contains(&to),
            "forward",
        )
    }

    async fn send_review(&self, to: UserId, request: &ReviewRequest) -> TransportResult<()> {
        self.record(
            Sent::Review {
                to,
                request: request.clone(),
            },
            |s| s.unreachable.contains(&to),
            "review",
        )
    }

    async fn reply(&self, to: &MessageRef, text: &str) -> TransportResult<()> {
        self.record(
            Sent::Reply {
                to: *to,
                text: text.to_string(),
            },
            |s| s.fail_reply,
            "reply",
        )
    }

    async fn answer_callback(&self, callback: &CallbackId, ack: &Ack) -> TransportResult<()> {
        self.record(
            Sent::Answered {
                callback: callback.clone(),
                ack: ack.clone(),
            },
            |s| s.fail_answer,
            "answer",
        )
    }

    async fn edit_view(&self, view: &MessageRef, text: &str) -> TransportResult<()> {
        self.record(
            Sent::Edited {
                view: *view,
                text: text.to_string(),
            },
            |s| s.fail_edit,
            "edit",
        )
    }
}
