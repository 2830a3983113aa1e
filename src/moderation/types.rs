//! Moderation data model: proposals, their status, and the events that drive them.

use super::texts;
use super::token::{Action, DecisionToken};
use crate::telegram::traits::{CallbackId, MessageRef, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest preview (in characters) rendered into a review request.
pub const MAX_PREVIEW_CHARS: usize = 200;

/// Store-assigned proposal identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProposalId(pub i64);

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Proposal lifecycle: `Pending` → `Approved` | `Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Approved => "approved",
            ProposalStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProposalStatus::Pending)
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProposalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProposalStatus::Pending),
            "approved" => Ok(ProposalStatus::Approved),
            "rejected" => Ok(ProposalStatus::Rejected),
            other => Err(format!("Unknown proposal status '{}'", other)),
        }
    }
}

/// Terminal status a decision moves a proposal into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Approved,
    Rejected,
}

impl From<Verdict> for ProposalStatus {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Approved => ProposalStatus::Approved,
            Verdict::Rejected => ProposalStatus::Rejected,
        }
    }
}

impl From<Action> for Verdict {
    fn from(action: Action) -> Self {
        match action {
            Action::Approve => Verdict::Approved,
            Action::Reject => Verdict::Rejected,
        }
    }
}

/// A stored submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub id: ProposalId,
    pub submitter: UserId,
    /// Where the original content lives. Never inspected, only forwarded.
    pub origin: MessageRef,
    pub status: ProposalStatus,
    /// Unix seconds.
    pub created_at: i64,
    /// Unix seconds of the single successful transition.
    pub decided_at: Option<i64>,
}

/// Static moderator allow-list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Moderators(Vec<UserId>);

impl Moderators {
    /// Build the allow-list, dropping duplicates but keeping first-seen order.
    pub fn new(ids: impl IntoIterator<Item = UserId>) -> Self {
        let mut unique: Vec<UserId> = Vec::new();
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        Self(unique)
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.0.contains(&user)
    }

    pub fn iter(&self) -> impl Iterator<Item = UserId> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The person behind a submission, as far as rendering needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitter {
    pub id: UserId,
    pub display_name: Option<String>,
}

/// Inbound submission event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub submitter: Submitter,
    pub origin: MessageRef,
    /// Text or caption, used only for rendering.
    pub preview: Option<String>,
}

/// Inbound decision event (a moderator pressed a button).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionEvent {
    pub actor: UserId,
    /// Raw callback data; parsed by the router, never trusted.
    pub token: String,
    pub callback: CallbackId,
    /// The message the button was attached to, if the transport still knows it.
    pub view: Option<MessageRef>,
}

/// Labeled action attached to a review request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: &'static str,
    pub token: DecisionToken,
}

/// Moderator-facing rendering request produced by ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRequest {
    pub proposal_id: ProposalId,
    pub origin: MessageRef,
    pub submitter: Submitter,
    pub preview: Option<String>,
}

impl ReviewRequest {
    pub fn new(proposal_id: ProposalId, submission: &Submission) -> Self {
        Self {
            proposal_id,
            origin: submission.origin,
            submitter: submission.submitter.clone(),
            preview: submission
                .preview
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(truncate_preview),
        }
    }

    pub fn text(&self) -> String {
        texts::review_request(
            self.proposal_id,
            &self.submitter,
            self.preview.as_deref(),
        )
    }

    /// Approve and reject actions, in display order.
    pub fn buttons(&self) -> [Button; 2] {
        [
            Button {
                label: texts::BUTTON_APPROVE,
                token: DecisionToken::new(Action::Approve, self.proposal_id),
            },
            Button {
                label: texts::BUTTON_REJECT,
                token: DecisionToken::new(Action::Reject, self.proposal_id),
            },
        ]
    }
}

fn truncate_preview(preview: &str) -> String {
    match preview.char_indices().nth(MAX_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}…", &preview[..cut]),
        None => preview.to_string(),
    }
}

/// Transient acknowledgment shown to whoever pressed a button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub text: String,
    /// Show as a modal alert instead of a toast.
    pub alert: bool,
}

impl Ack {
    pub fn toast(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            alert: false,
        }
    }

    pub fn alert(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            alert: true,
        }
    }

    /// Acknowledge without any visible text.
    pub fn silent() -> Self {
        Self::toast("")
    }
}
