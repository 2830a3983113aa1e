//! Ingestion Handler
//!
//! Stores a submission as a pending proposal, then fans the review request out
//! to every moderator and confirms receipt to the submitter. If the store
//! write fails nothing is sent to moderators.

use super::texts;
use super::types::{Moderators, ProposalId, ReviewRequest, Submission};
use super::ModerationError;
use crate::store::ProposalStore;
use crate::telegram::traits::{ChatTransport, UserId};
use futures::future::join_all;
use tracing::{error, info, warn};

/// Result of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingested {
    pub proposal_id: ProposalId,
    pub request: ReviewRequest,
    /// Moderators that received the review request.
    pub delivered: usize,
}

pub struct IngestionHandler<S: ProposalStore, T: ChatTransport> {
    store: S,
    transport: T,
    moderators: Moderators,
}

impl<S: ProposalStore, T: ChatTransport> IngestionHandler<S, T> {
    pub fn new(store: S, transport: T, moderators: Moderators) -> Self {
        Self {
            store,
            transport,
            moderators,
        }
    }

    pub async fn ingest(&self, submission: Submission) -> Result<Ingested, ModerationError> {
        let submitter = submission.submitter.id;

        let proposal_id = match self.store.create(submitter, &submission.origin).await {
            Ok(id) => id,
            Err(e) => {
                error!(submitter = %submitter, error = %e, "could not store submission");
                self.reply_to_submitter(&submission, texts::INGEST_FAILED)
                    .await;
                return Err(ModerationError::Storage(e));
            }
        };
        info!(proposal_id = %proposal_id, submitter = %submitter, "proposal queued");

        let request = ReviewRequest::new(proposal_id, &submission);
        let (delivered, ()) = tokio::join!(
            self.fan_out(&request),
            self.reply_to_submitter(&submission, texts::QUEUED)
        );

        if delivered == 0 && !self.moderators.is_empty() {
            warn!(proposal_id = %proposal_id, "no moderator could be reached");
        }

        Ok(Ingested {
            proposal_id,
            request,
            delivered,
        })
    }

    /// Send the review request to every moderator concurrently. Returns how
    /// many received it.
    async fn fan_out(&self, request: &ReviewRequest) -> usize {
        let deliveries = self
            .moderators
            .iter()
            .map(|moderator| self.deliver(moderator, request));

        join_all(deliveries)
            .await
            .into_iter()
            .filter(|delivered| *delivered)
            .count()
    }

    /// Forward the original so the moderator sees the content, then the
    /// review request with its buttons.
    async fn deliver(&self, moderator: UserId, request: &ReviewRequest) -> bool {
        let sent = match self.transport.forward(moderator, &request.origin).await {
            Ok(()) => self.transport.send_review(moderator, request).await,
            Err(e) => Err(e),
        };

        match sent {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    proposal_id = %request.proposal_id,
                    moderator = %moderator,
                    error = %e,
                    "failed to notify moderator"
                );
                false
            }
        }
    }

    async fn reply_to_submitter(&self, submission: &Submission, text: &str) {
        if let Err(e) = self.transport.reply(&submission.origin, text).await {
            warn!(
                submitter = %submission.submitter.id,
                error = %e,
                "could not reply to submitter"
            );
        }
    }
}
