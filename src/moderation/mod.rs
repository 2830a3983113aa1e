//! Moderation pipeline
//!
//! Submission → pending proposal → one moderator decision → publication and
//! submitter notice. The store's conditional transition is the only thing
//! that decides which moderator action counts.

pub mod ingest;
pub mod pipeline;
pub mod publish;
pub mod router;
pub mod texts;
pub mod token;
pub mod types;

#[cfg(test)]
mod proptests;

use crate::store::StoreError;

pub use ingest::{Ingested, IngestionHandler};
pub use pipeline::{InboundEvent, Pipeline, PipelineSettings};
pub use publish::{Publisher, Resolution};
pub use router::{DecisionOutcome, DecisionRouter};
pub use token::{Action, DecisionToken, TokenError, MAX_TOKEN_LEN};
pub use types::{
    Ack, DecisionEvent, Moderators, Proposal, ProposalId, ProposalStatus, ReviewRequest,
    Submission, Submitter, Verdict,
};

/// Ingestion errors
#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),
}
