//! SQLite-backed proposal store (proposals.db)
//!
//! One table, one row per submission. The decide-once rule is the
//! `WHERE status = 'pending'` clause of the transition UPDATE: SQLite
//! serializes writers, so only the first update finds the row pending.

use super::{unix_now, ProposalStore, StatusCounts, StoreError, StoreResult};
use crate::moderation::types::{Proposal, ProposalId, ProposalStatus, Verdict};
use crate::telegram::traits::{ChatId, MessageRef, UserId};
use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS proposals (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    submitter_id      INTEGER NOT NULL,
    origin_chat_id    INTEGER NOT NULL,
    origin_message_id INTEGER NOT NULL,
    status            TEXT    NOT NULL DEFAULT 'pending'
                      CHECK (status IN ('pending', 'approved', 'rejected')),
    created_at        INTEGER NOT NULL,
    decided_at        INTEGER
)
"#;

/// Pool size for on-disk databases.
const MAX_CONNECTIONS: u32 = 5;

/// How long a writer waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SqliteProposalStore {
    pool: SqlitePool,
}

impl SqliteProposalStore {
    /// Open (or create) the database file and apply the schema.
    pub async fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        debug!(path = %path.display(), "opened proposal store");
        Self::with_pool(pool).await
    }

    /// Private in-memory database, for tests.
    ///
    /// Every SQLite in-memory connection is its own database, so the pool is
    /// pinned to a single connection that never expires.
    pub async fn open_in_memory() -> StoreResult<Self> {
        let options: SqliteConnectOptions = "sqlite::memory:".parse()?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> StoreResult<Self> {
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Close all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn proposal_from_row(row: &SqliteRow) -> StoreResult<Proposal> {
    let status: String = row.try_get("status")?;
    let status = status.parse::<ProposalStatus>().map_err(StoreError::Corrupt)?;

    Ok(Proposal {
        id: ProposalId(row.try_get("id")?),
        submitter: UserId(row.try_get("submitter_id")?),
        origin: MessageRef {
            chat_id: ChatId(row.try_get("origin_chat_id")?),
            message_id: row.try_get("origin_message_id")?,
        },
        status,
        created_at: row.try_get("created_at")?,
        decided_at: row.try_get("decided_at")?,
    })
}

#[async_trait]
impl ProposalStore for SqliteProposalStore {
    async fn create(&self, submitter: UserId, origin: &MessageRef) -> StoreResult<ProposalId> {
        let result = sqlx::query(
            "INSERT INTO proposals (submitter_id, origin_chat_id, origin_message_id, status, created_at) \
             VALUES (?, ?, ?, 'pending', ?)",
        )
        .bind(submitter.0)
        .bind(origin.chat_id.0)
        .bind(origin.message_id)
        .bind(unix_now())
        .execute(&self.pool)
        .await?;

        Ok(ProposalId(result.last_insert_rowid()))
    }

    async fn get(&self, id: ProposalId) -> StoreResult<Option<Proposal>> {
        let row = sqlx::query(
            "SELECT id, submitter_id, origin_chat_id, origin_message_id, status, created_at, decided_at \
             FROM proposals WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(proposal_from_row).transpose()
    }

    async fn transition(&self, id: ProposalId, verdict: Verdict) -> StoreResult<bool> {
        let status = ProposalStatus::from(verdict);
        let result = sqlx::query(
            "UPDATE proposals SET status = ?, decided_at = ? \
             WHERE id = ? AND status = 'pending'",
        )
        .bind(status.as_str())
        .bind(unix_now())
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn counts(&self) -> StoreResult<StatusCounts> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM proposals GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            let count = count.max(0) as u64;
            match status.parse::<ProposalStatus>().map_err(StoreError::Corrupt)? {
                ProposalStatus::Pending => counts.pending = count,
                ProposalStatus::Approved => counts.approved = count,
                ProposalStatus::Rejected => counts.rejected = count,
            }
        }
        Ok(counts)
    }
}
