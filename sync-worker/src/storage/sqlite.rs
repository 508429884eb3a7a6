//! SQLite storage backend for the sync worker.

use super::{LocalTicket, TicketStore};
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use sync_core::{Partition, TicketId, DEFAULT_BATCH_LIMIT};

/// SQLite-based ticket storage.
///
/// Uses WAL mode for concurrent reads/writes.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
    batch_limit: usize,
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage")
            .field("batch_limit", &self.batch_limit)
            .finish_non_exhaustive()
    }
}

impl SqliteStorage {
    /// Create a new SQLite storage from a database path.
    ///
    /// Creates the database file if it doesn't exist.
    pub async fn new(path: &Path) -> StorageResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(StorageError::Database)?;

        let storage = Self {
            pool,
            batch_limit: DEFAULT_BATCH_LIMIT,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Create an in-memory SQLite storage (for testing).
    pub async fn in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str(":memory:")
            .map_err(StorageError::Database)?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(StorageError::Database)?;

        let storage = Self {
            pool,
            batch_limit: DEFAULT_BATCH_LIMIT,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Set the maximum number of tickets accepted per batch.
    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = limit.max(1);
        self
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> StorageResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tito_tickets (
                conference_instance TEXT NOT NULL,
                ticket_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (conference_instance, ticket_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(())
    }

    /// Count tickets across every partition.
    pub async fn total_tickets(&self) -> StorageResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tito_tickets")
            .fetch_one(&self.pool)
            .await
            .map_err(StorageError::Database)?;

        Ok(count as u64)
    }
}

#[async_trait]
impl TicketStore for SqliteStorage {
    async fn get_all(&self, partition: &Partition) -> StorageResult<Vec<LocalTicket>> {
        let rows = sqlx::query_as::<_, TicketRow>(
            r#"
            SELECT conference_instance, ticket_id, created_at
            FROM tito_tickets
            WHERE conference_instance = ?1
            ORDER BY created_at ASC, ticket_id ASC
            "#,
        )
        .bind(partition.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        rows.into_iter().map(|row| row.try_into()).collect()
    }

    async fn create_batch(
        &self,
        partition: &Partition,
        tickets: &[LocalTicket],
    ) -> StorageResult<u64> {
        if tickets.is_empty() {
            return Ok(0);
        }
        if tickets.len() > self.batch_limit {
            return Err(StorageError::BatchTooLarge {
                size: tickets.len(),
                limit: self.batch_limit,
            });
        }
        if let Some(stray) = tickets.iter().find(|t| &t.partition != partition) {
            return Err(StorageError::PartitionMismatch {
                ticket_id: stray.ticket_id.to_string(),
                expected: partition.to_string(),
                found: stray.partition.to_string(),
            });
        }

        // Single transaction: either the whole batch lands or none of it
        let mut tx = self.pool.begin().await.map_err(StorageError::Database)?;

        for ticket in tickets {
            sqlx::query(
                r#"
                INSERT INTO tito_tickets (conference_instance, ticket_id, created_at)
                VALUES (?1, ?2, ?3)
                "#,
            )
            .bind(partition.as_str())
            .bind(ticket.ticket_id.as_str())
            .bind(ticket.created_at)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::Database)?;
        }

        tx.commit().await.map_err(StorageError::Database)?;
        Ok(tickets.len() as u64)
    }

    async fn count(&self, partition: &Partition) -> StorageResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tito_tickets WHERE conference_instance = ?1",
        )
        .bind(partition.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::Database)?;

        Ok(count as u64)
    }

    fn batch_limit(&self) -> usize {
        self.batch_limit
    }
}

/// Internal row type for SQLite queries.
#[derive(sqlx::FromRow)]
struct TicketRow {
    conference_instance: String,
    ticket_id: String,
    created_at: i64,
}

impl TryFrom<TicketRow> for LocalTicket {
    type Error = StorageError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        Ok(LocalTicket {
            partition: Partition::new(row.conference_instance)
                .map_err(|e| StorageError::CorruptRow(e.to_string()))?,
            ticket_id: TicketId::new(row.ticket_id)
                .map_err(|e| StorageError::CorruptRow(e.to_string()))?,
            created_at: row.created_at,
        })
    }
}
