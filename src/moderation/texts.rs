//! User-facing strings.

use super::types::{ProposalId, ProposalStatus, Submitter};

pub const GREETING: &str = "Hi! Send me your proposal: text, a photo, a video or any other message. \
     Moderators will review it before it is published.";

pub const QUEUED: &str = "🕙 Your proposal has been sent to the moderators for review.";
pub const INGEST_FAILED: &str =
    "⚠️ Sorry, your proposal could not be saved. Please try again later.";

pub const SUBMITTER_APPROVED: &str = "✅ Your proposal was approved and published in the channel.";
pub const SUBMITTER_REJECTED: &str = "❌ Your proposal was rejected by the moderators.";

pub const BUTTON_APPROVE: &str = "✅ Approve";
pub const BUTTON_REJECT: &str = "❌ Reject";

pub const ACK_APPROVED: &str = "Proposal approved and published.";
pub const ACK_REJECTED: &str = "Proposal rejected.";
pub const ACK_PUBLISH_FAILED: &str = "Publishing to the channel failed. The proposal is already \
     marked approved; check that the bot is an admin of the channel and repost it manually.";
pub const ACK_ALREADY_DECIDED: &str = "This proposal has already been decided.";
pub const ACK_NOT_FOUND: &str = "Proposal not found.";
pub const ACK_UNAUTHORIZED: &str = "You are not allowed to do this.";
pub const ACK_STORAGE_FAILURE: &str = "Something went wrong, please try again.";

pub fn review_request(id: ProposalId, submitter: &Submitter, preview: Option<&str>) -> String {
    let name = submitter.display_name.as_deref().unwrap_or("anonymous");
    let mut text = format!(
        "New proposal #{}\nFrom: {} (id {})",
        id, name, submitter.id
    );
    if let Some(preview) = preview {
        text.push_str("\n\n");
        text.push_str(preview);
    }
    text
}

pub fn decided_label(id: ProposalId, status: ProposalStatus) -> String {
    match status {
        ProposalStatus::Approved => format!("Proposal #{}: ✅ APPROVED", id),
        ProposalStatus::Rejected => format!("Proposal #{}: ❌ REJECTED", id),
        ProposalStatus::Pending => format!("Proposal #{}: pending", id),
    }
}

pub fn publish_failed_label(id: ProposalId) -> String {
    format!("Proposal #{}: ✅ APPROVED (publish failed)", id)
}

pub fn already_decided_label(id: ProposalId, status: ProposalStatus) -> String {
    format!("Proposal #{}: already {}.", id, status)
}
