//! Proposal Store
//!
//! Durable record of every submission and its status. The store is the only
//! owner of proposal rows and the only place the state machine is enforced:
//! [`ProposalStore::transition`] is a conditional update that succeeds for
//! exactly one caller per proposal.

pub mod sqlite;

use crate::moderation::types::{Proposal, ProposalId, Verdict};
use crate::telegram::traits::{MessageRef, UserId};
use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};

pub use sqlite::SqliteProposalStore;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage faults. Every variant means "the store could not answer".
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt proposal row: {0}")]
    Corrupt(String),
}

/// Number of proposals per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
}

impl StatusCounts {
    pub fn total(&self) -> u64 {
        self.pending + self.approved + self.rejected
    }
}

/// Durable proposal storage.
#[async_trait]
pub trait ProposalStore: Clone + Send + Sync + 'static {
    /// Insert a new `pending` proposal and return its freshly assigned id.
    async fn create(&self, submitter: UserId, origin: &MessageRef) -> StoreResult<ProposalId>;

    /// Point lookup. `None` means the id was never created.
    async fn get(&self, id: ProposalId) -> StoreResult<Option<Proposal>>;

    /// Move a `pending` proposal to `verdict`.
    ///
    /// Returns `false` without writing when the proposal is not pending
    /// (already decided, or missing). Concurrent calls for the same id never
    /// both return `true`.
    async fn transition(&self, id: ProposalId, verdict: Verdict) -> StoreResult<bool>;

    /// Proposal counts per status.
    async fn counts(&self) -> StoreResult<StatusCounts>;
}

/// Current time as unix seconds.
pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
