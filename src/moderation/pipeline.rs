//! Event entry point.
//!
//! The ingress converts transport updates into [`InboundEvent`]s and hands
//! each one to [`Pipeline::handle`] on its own task.

use super::ingest::{Ingested, IngestionHandler};
use super::publish::Publisher;
use super::router::{DecisionOutcome, DecisionRouter};
use super::texts;
use super::types::{DecisionEvent, Moderators, Submission};
use super::ModerationError;
use crate::store::ProposalStore;
use crate::telegram::retry::RetryPolicy;
use crate::telegram::traits::{ChatRef, ChatTransport, MessageRef};
use tracing::{debug, warn};

/// Everything the core needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub moderators: Moderators,
    pub outlet: ChatRef,
    pub publish_retry: RetryPolicy,
}

/// Inbound events, already stripped of transport detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// `/start` or `/help` in a private chat.
    Start { chat: MessageRef },
    Submission(Submission),
    Decision(DecisionEvent),
}

pub struct Pipeline<S: ProposalStore, T: ChatTransport> {
    ingest: IngestionHandler<S, T>,
    router: DecisionRouter<S, T>,
    transport: T,
}

impl<S: ProposalStore, T: ChatTransport> Pipeline<S, T> {
    pub fn new(store: S, transport: T, settings: PipelineSettings) -> Self {
        let publisher = Publisher::new(
            transport.clone(),
            settings.outlet,
            settings.publish_retry,
        );
        Self {
            ingest: IngestionHandler::new(
                store.clone(),
                transport.clone(),
                settings.moderators.clone(),
            ),
            router: DecisionRouter::new(store, settings.moderators, publisher),
            transport,
        }
    }

    pub async fn handle(&self, event: InboundEvent) {
        match event {
            InboundEvent::Start { chat } => {
                if let Err(e) = self.transport.reply(&chat, texts::GREETING).await {
                    warn!(error = %e, "could not send greeting");
                }
            }
            InboundEvent::Submission(submission) => {
                // Failures are logged and answered inside the handler.
                let _ = self.handle_submission(submission).await;
            }
            InboundEvent::Decision(decision) => {
                self.handle_decision(decision).await;
            }
        }
    }

    pub async fn handle_submission(
        &self,
        submission: Submission,
    ) -> Result<Ingested, ModerationError> {
        self.ingest.ingest(submission).await
    }

    /// Route a decision, then acknowledge the press and update the view it
    /// came from. Both deliveries are best-effort.
    pub async fn handle_decision(&self, decision: DecisionEvent) -> DecisionOutcome {
        let outcome = self.router.decide(decision.actor, &decision.token).await;
        debug!(actor = %decision.actor, outcome = ?outcome, "decision routed");

        if let Err(e) = self
            .transport
            .answer_callback(&decision.callback, &outcome.ack())
            .await
        {
            warn!(actor = %decision.actor, error = %e, "could not answer callback");
        }

        if let (Some(view), Some(label)) = (decision.view, outcome.view_label()) {
            if let Err(e) = self.transport.edit_view(&view, &label).await {
                warn!(actor = %decision.actor, error = %e, "could not update moderator view");
            }
        }

        outcome
    }
}
