//! Decision Router
//!
//! Validates a moderator's button press and applies it to the store:
//!
//! 1. Authorization against the static allow-list (no store access otherwise)
//! 2. Structural token validation (no store access otherwise)
//! 3. Lookup
//! 4. Conditional transition; only the winner proceeds to publication
//!
//! Duplicate or concurrent presses for the same proposal all lose at step 4
//! except one, so side effects happen at most once per proposal.

use super::publish::{Publisher, Resolution};
use super::texts;
use super::token::DecisionToken;
use super::types::{Ack, Moderators, ProposalId, ProposalStatus, Verdict};
use crate::store::ProposalStore;
use crate::telegram::traits::{ChatTransport, UserId};
use tracing::{debug, error, info, warn};

/// Result of routing one decision event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOutcome {
    /// This event decided the proposal and its side effects ran.
    Decided {
        proposal_id: ProposalId,
        verdict: Verdict,
    },
    /// Recorded as approved, but republishing failed.
    PublishFailed { proposal_id: ProposalId },
    /// Someone else decided first. `status` is the winner's outcome when it
    /// could be re-read.
    AlreadyDecided {
        proposal_id: ProposalId,
        status: Option<ProposalStatus>,
    },
    NotFound { proposal_id: ProposalId },
    /// Token is not one of ours (foreign or malformed button).
    NotApplicable,
    Unauthorized,
    StorageFailure,
}

impl DecisionOutcome {
    /// Acknowledgment shown to the actor.
    pub fn ack(&self) -> Ack {
        match self {
            DecisionOutcome::Decided {
                verdict: Verdict::Approved,
                ..
            } => Ack::toast(texts::ACK_APPROVED),
            DecisionOutcome::Decided {
                verdict: Verdict::Rejected,
                ..
            } => Ack::toast(texts::ACK_REJECTED),
            DecisionOutcome::PublishFailed { .. } => Ack::alert(texts::ACK_PUBLISH_FAILED),
            DecisionOutcome::AlreadyDecided { .. } => Ack::alert(texts::ACK_ALREADY_DECIDED),
            DecisionOutcome::NotFound { .. } => Ack::toast(texts::ACK_NOT_FOUND),
            DecisionOutcome::NotApplicable => Ack::silent(),
            DecisionOutcome::Unauthorized => Ack::alert(texts::ACK_UNAUTHORIZED),
            DecisionOutcome::StorageFailure => Ack::alert(texts::ACK_STORAGE_FAILURE),
        }
    }

    /// Terminal-state label for the moderator's view, when there is one.
    pub fn view_label(&self) -> Option<String> {
        match *self {
            DecisionOutcome::Decided {
                proposal_id,
                verdict,
            } => Some(texts::decided_label(proposal_id, verdict.into())),
            DecisionOutcome::PublishFailed { proposal_id } => {
                Some(texts::publish_failed_label(proposal_id))
            }
            DecisionOutcome::AlreadyDecided {
                proposal_id,
                status: Some(status),
            } => Some(texts::already_decided_label(proposal_id, status)),
            _ => None,
        }
    }
}

pub struct DecisionRouter<S: ProposalStore, T: ChatTransport> {
    store: S,
    moderators: Moderators,
    publisher: Publisher<T>,
}

impl<S: ProposalStore, T: ChatTransport> DecisionRouter<S, T> {
    pub fn new(store: S, moderators: Moderators, publisher: Publisher<T>) -> Self {
        Self {
            store,
            moderators,
            publisher,
        }
    }

    /// Route one decision. Never fails; every path ends in an outcome the
    /// actor can be shown.
    pub async fn decide(&self, actor: UserId, raw_token: &str) -> DecisionOutcome {
        if !self.moderators.contains(actor) {
            warn!(actor = %actor, "decision from non-moderator ignored");
            return DecisionOutcome::Unauthorized;
        }

        let token = match DecisionToken::parse(raw_token) {
            Ok(token) => token,
            Err(e) => {
                debug!(actor = %actor, error = %e, "ignoring foreign callback data");
                return DecisionOutcome::NotApplicable;
            }
        };
        let proposal_id = token.proposal_id;
        let verdict = Verdict::from(token.action);

        let proposal = match self.store.get(proposal_id).await {
            Ok(Some(proposal)) => proposal,
            Ok(None) => {
                info!(proposal_id = %proposal_id, actor = %actor, "decision for unknown proposal");
                return DecisionOutcome::NotFound { proposal_id };
            }
            Err(e) => {
                error!(proposal_id = %proposal_id, error = %e, "proposal lookup failed");
                return DecisionOutcome::StorageFailure;
            }
        };

        match self.store.transition(proposal_id, verdict).await {
            Ok(true) => {}
            Ok(false) => {
                let status = self.current_status(proposal_id).await;
                info!(
                    proposal_id = %proposal_id,
                    actor = %actor,
                    status = ?status,
                    "proposal already decided"
                );
                return DecisionOutcome::AlreadyDecided {
                    proposal_id,
                    status,
                };
            }
            Err(e) => {
                error!(proposal_id = %proposal_id, error = %e, "proposal transition failed");
                return DecisionOutcome::StorageFailure;
            }
        }

        info!(
            proposal_id = %proposal_id,
            actor = %actor,
            verdict = ?verdict,
            "proposal decided"
        );

        match self.publisher.resolve(&proposal, verdict).await {
            Resolution::PublishFailed => DecisionOutcome::PublishFailed { proposal_id },
            Resolution::Published | Resolution::Rejected => DecisionOutcome::Decided {
                proposal_id,
                verdict,
            },
        }
    }

    /// Best-effort re-read after a lost race.
    async fn current_status(&self, proposal_id: ProposalId) -> Option<ProposalStatus> {
        match self.store.get(proposal_id).await {
            Ok(proposal) => proposal.map(|p| p.status).filter(ProposalStatus::is_terminal),
            Err(e) => {
                warn!(proposal_id = %proposal_id, error = %e, "could not re-read proposal status");
                None
            }
        }
    }
}
