//! Publication & notification: the side effects of a recorded decision.
//!
//! Runs only after the store transition succeeded. Nothing here can undo that
//! transition; a failed publish is reported, never rolled back.

use super::texts;
use super::types::{Proposal, Verdict};
use crate::telegram::retry::{retry_with_backoff_if, RetryPolicy};
use crate::telegram::traits::{ChatRef, ChatTransport, TransportError};
use tracing::{error, info, warn};

/// What the side effects of a decision amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Approved and republished to the outlet.
    Published,
    /// Approved, but the outlet rejected or never received the copy.
    PublishFailed,
    Rejected,
}

pub struct Publisher<T: ChatTransport> {
    transport: T,
    outlet: ChatRef,
    retry: RetryPolicy,
}

impl<T: ChatTransport> Publisher<T> {
    pub fn new(transport: T, outlet: ChatRef, retry: RetryPolicy) -> Self {
        Self {
            transport,
            outlet,
            retry,
        }
    }

    /// Carry out a decision that is already recorded in the store.
    pub async fn resolve(&self, proposal: &Proposal, verdict: Verdict) -> Resolution {
        match verdict {
            Verdict::Approved => {
                // A copy is not idempotent: after a network error it may
                // already be in the outlet, so only rate limits are retried.
                let published = retry_with_backoff_if(
                    &self.retry,
                    TransportError::is_safe_to_repeat,
                    || self.transport.publish(&self.outlet, &proposal.origin),
                )
                .await;

                match published {
                    Ok(()) => {
                        info!(proposal_id = %proposal.id, outlet = %self.outlet, "proposal published");
                        self.notify_submitter(proposal, texts::SUBMITTER_APPROVED)
                            .await;
                        Resolution::Published
                    }
                    Err(e) => {
                        error!(
                            proposal_id = %proposal.id,
                            outlet = %self.outlet,
                            error = %e,
                            "publish failed, proposal stays approved"
                        );
                        Resolution::PublishFailed
                    }
                }
            }
            Verdict::Rejected => {
                self.notify_submitter(proposal, texts::SUBMITTER_REJECTED)
                    .await;
                Resolution::Rejected
            }
        }
    }

    async fn notify_submitter(&self, proposal: &Proposal, text: &str) {
        if let Err(e) = self.transport.notify(proposal.submitter, text).await {
            warn!(
                proposal_id = %proposal.id,
                submitter = %proposal.submitter,
                error = %e,
                "could not notify submitter"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moderation::types::{ProposalId, ProposalStatus};
    use crate::telegram::mock::MockTransport;
    use crate::telegram::traits::{ChatId, MessageRef, UserId};

    fn proposal() -> Proposal {
        Proposal {
            id: ProposalId(1),
            submitter: UserId(10),
            origin: MessageRef {
                chat_id: ChatId(10),
                message_id: 3,
            },
            status: ProposalStatus::Approved,
            created_at: 0,
            decided_at: Some(1),
        }
    }

    fn publisher(transport: &MockTransport) -> Publisher<MockTransport> {
        Publisher::new(transport.clone(), ChatRef::Id(-100), RetryPolicy::none())
    }

    #[tokio::test]
    async fn test_approve_publishes_then_notifies() {
        let transport = MockTransport::new();
        let resolution = publisher(&transport)
            .resolve(&proposal(), Verdict::Approved)
            .await;

        assert_eq!(resolution, Resolution::Published);
        assert_eq!(transport.published(), vec![proposal().origin]);
        assert_eq!(
            transport.notifications_to(UserId(10)),
            vec![texts::SUBMITTER_APPROVED]
        );
    }

    #[tokio::test]
    async fn test_publish_failure_skips_submitter_notice() {
        let transport = MockTransport::new();
        transport.set_fail_publish(true);

        let resolution = publisher(&transport)
            .resolve(&proposal(), Verdict::Approved)
            .await;

        assert_eq!(resolution, Resolution::PublishFailed);
        assert!(transport.notifications_to(UserId(10)).is_empty());
    }

    fn retrying(transport: &MockTransport) -> Publisher<MockTransport> {
        let retry = RetryPolicy {
            max_attempts: 3,
            base_delay: std::time::Duration::ZERO,
        };
        Publisher::new(transport.clone(), ChatRef::Id(-100), retry)
    }

    #[tokio::test]
    async fn test_network_error_is_not_republished() {
        let transport = MockTransport::new();
        // The outlet got the copy but the response was lost.
        transport.fail_next_publish(TransportError::Network("operation timed out".to_string()), true);

        let resolution = retrying(&transport)
            .resolve(&proposal(), Verdict::Approved)
            .await;

        assert_eq!(resolution, Resolution::PublishFailed);
        assert_eq!(transport.published().len(), 1);
        assert!(transport.notifications_to(UserId(10)).is_empty());
    }

    #[tokio::test]
    async fn test_rate_limited_publish_is_retried() {
        let transport = MockTransport::new();
        transport.fail_next_publish(TransportError::RateLimited { retry_after: 0 }, false);

        let resolution = retrying(&transport)
            .resolve(&proposal(), Verdict::Approved)
            .await;

        assert_eq!(resolution, Resolution::Published);
        assert_eq!(transport.published(), vec![proposal().origin]);
        assert_eq!(
            transport.notifications_to(UserId(10)),
            vec![texts::SUBMITTER_APPROVED]
        );
    }

    #[tokio::test]
    async fn test_reject_notifies_without_publishing() {
        let transport = MockTransport::new();
        let resolution = publisher(&transport)
            .resolve(&proposal(), Verdict::Rejected)
            .await;

        assert_eq!(resolution, Resolution::Rejected);
        assert!(transport.published().is_empty());
        assert_eq!(
            transport.notifications_to(UserId(10)),
            vec![texts::SUBMITTER_REJECTED]
        );
    }

    #[tokio::test]
    async fn test_notify_failure_does_not_change_resolution() {
        let transport = MockTransport::new();
        transport.set_fail_notify(true);

        let resolution = publisher(&transport)
            .resolve(&proposal(), Verdict::Approved)
            .await;
        assert_eq!(resolution, Resolution::Published);

        let resolution = publisher(&transport)
            .resolve(&proposal(), Verdict::Rejected)
            .await;
        assert_eq!(resolution, Resolution::Rejected);
    }
}
