//! Error types for the sync worker.

use std::time::Duration;

/// Main error type for worker operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Registrations client could not be built.
    #[error("http client error: {0}")]
    Client(#[source] reqwest::Error),
}

/// Failure fetching one page of registrations.
///
/// The walker treats either variant as the end of the data for the run.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Transport failure, timeout or non-success HTTP status.
    #[error("registrations API unavailable on page {page}: {reason}")]
    RemoteUnavailable {
        /// The page being fetched.
        page: u32,
        /// What went wrong.
        reason: String,
    },

    /// The response body was not a valid page envelope.
    #[error("malformed registrations page {page}: {source}")]
    Decode {
        /// The page being fetched.
        page: u32,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// The page the failure occurred on.
    pub fn page(&self) -> u32 {
        match self {
            Self::RemoteUnavailable { page, .. } | Self::Decode { page, .. } => *page,
        }
    }
}

/// Storage layer errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Batch exceeds the store's bulk-write limit.
    #[error("batch too large: {size} records (limit: {limit})")]
    BatchTooLarge {
        /// Records in the rejected batch.
        size: usize,
        /// Maximum accepted per batch.
        limit: usize,
    },

    /// A record belongs to a different partition than the batch.
    #[error("record {ticket_id} belongs to partition {found}, batch is for {expected}")]
    PartitionMismatch {
        /// The offending ticket.
        ticket_id: String,
        /// Partition of the batch.
        expected: String,
        /// Partition of the record.
        found: String,
    },

    /// A stored row could not be turned back into a record.
    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

/// Errors that fail a sync run.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Reading local state failed.
    #[error("failed to read local tickets: {0}")]
    LocalState(#[source] StorageError),

    /// The bulk insert failed; nothing from this batch is assumed written.
    #[error("failed to persist new tickets: {0}")]
    Persistence(#[source] StorageError),

    /// The run exceeded its overall deadline.
    #[error("sync run exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),
}

/// Result type alias for worker operations.
pub type Result<T> = std::result::Result<T, WorkerError>;

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Result type alias for page fetches.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for sync runs.
pub type SyncResult<T> = std::result::Result<T, SyncError>;
