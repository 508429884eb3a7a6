//! Storage layer for the sync worker.
//!
//! Provides partitioned ticket storage with get-all and batch-insert
//! semantics. The store does not deduplicate; callers only insert ids they
//! have checked are absent.

mod sqlite;

pub use sqlite::SqliteStorage;

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::HashSet;
use sync_core::{Partition, TicketId};

/// A ticket persisted locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTicket {
    /// Partition (conference instance) the ticket belongs to.
    pub partition: Partition,
    /// Remote ticket identifier.
    pub ticket_id: TicketId,
    /// Unix timestamp when the ticket was first stored.
    pub created_at: i64,
}

impl LocalTicket {
    /// Create a record for a newly seen ticket.
    pub fn new(partition: Partition, ticket_id: TicketId, created_at: i64) -> Self {
        Self {
            partition,
            ticket_id,
            created_at,
        }
    }
}

/// Trait for ticket storage backends.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Get every ticket stored for a partition.
    async fn get_all(&self, partition: &Partition) -> StorageResult<Vec<LocalTicket>>;

    /// Get the ids of every ticket stored for a partition.
    async fn all_ticket_ids(
        &self,
        partition: &Partition,
    ) -> StorageResult<HashSet<TicketId>> {
        Ok(self
            .get_all(partition)
            .await?
            .into_iter()
            .map(|t| t.ticket_id)
            .collect())
    }

    /// Insert a batch of tickets in one all-or-nothing write.
    ///
    /// Returns the number of tickets inserted. An empty batch is a no-op.
    async fn create_batch(
        &self,
        partition: &Partition,
        tickets: &[LocalTicket],
    ) -> StorageResult<u64>;

    /// Count the tickets stored for a partition.
    async fn count(&self, partition: &Partition) -> StorageResult<u64>;

    /// Maximum number of tickets accepted by one `create_batch` call.
    fn batch_limit(&self) -> usize;
}
