//! Incremental sync engine.
//!
//! One run walks every remote page, subtracts the tickets already stored
//! for the partition, caps the remainder at the store's bulk-write limit and
//! writes it in a single batch. Writes happen only after the walk has
//! finished, so abandoning a run mid-walk leaves the store untouched.
//!
//! The engine holds no lock. Two runs against the same partition at once
//! could compute overlapping deltas; the scheduler runs one at a time.

use crate::error::{SyncError, SyncResult};
use crate::remote::RegistrationSource;
use crate::storage::{LocalTicket, TicketStore};
use crate::walker::walk_all;
use serde::Serialize;
use std::sync::Arc;
use sync_core::{compute_delta, BatchPlan, Partition, TicketId, DEFAULT_MAX_PAGES};

/// Per-engine settings.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Partition new tickets are stored under.
    pub partition: Partition,
    /// Maximum tickets written per run.
    pub batch_limit: usize,
    /// Maximum pages fetched per run.
    pub max_pages: u32,
}

impl EngineSettings {
    /// Settings with default limits for the given partition.
    pub fn new(partition: Partition) -> Self {
        Self {
            partition,
            batch_limit: sync_core::DEFAULT_BATCH_LIMIT,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Summary of one completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Pages successfully fetched.
    pub pages_fetched: u32,
    /// Whether every reported page was read.
    pub walk_complete: bool,
    /// Why the walk stopped.
    pub walk_end: String,
    /// Ticket ids seen remotely, duplicates included.
    pub remote_count: usize,
    /// Tickets already stored at the start of the run.
    pub existing_count: usize,
    /// Remote tickets not yet stored, before capping.
    pub delta_count: usize,
    /// Tickets written in this run.
    pub inserted: u64,
    /// Tickets left for a later run by the batch cap.
    pub deferred: usize,
}

/// The sync engine. Cheap to share behind an `Arc`.
pub struct SyncEngine {
    source: Arc<dyn RegistrationSource>,
    store: Arc<dyn TicketStore>,
    settings: EngineSettings,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl SyncEngine {
    /// Create an engine over a source and a store.
    ///
    /// The batch limit is clamped to what the store accepts per call.
    pub fn new(
        source: Arc<dyn RegistrationSource>,
        store: Arc<dyn TicketStore>,
        mut settings: EngineSettings,
    ) -> Self {
        settings.batch_limit = settings.batch_limit.clamp(1, store.batch_limit().max(1));
        Self {
            source,
            store,
            settings,
        }
    }

    /// Get the engine settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Get the partition this engine writes to.
    pub fn partition(&self) -> &Partition {
        &self.settings.partition
    }

    /// Perform one sync run.
    ///
    /// Remote failures end the walk early but do not fail the run; the
    /// tickets seen before the failure are still persisted. Local read or
    /// write failures fail the run.
    pub async fn run_once(&self) -> SyncResult<SyncReport> {
        let outcome = walk_all(self.source.as_ref(), self.settings.max_pages).await;

        let local_ids = self
            .store
            .all_ticket_ids(&self.settings.partition)
            .await
            .map_err(SyncError::LocalState)?;

        let delta = compute_delta(&outcome.ids, &local_ids);
        let delta_count = delta.len();

        let plan = BatchPlan::cap(delta, self.settings.batch_limit);
        tracing::info!(
            "Found {} existing tickets and {} current tickets. Inserting {} new tickets.",
            local_ids.len(),
            outcome.ids.len(),
            plan.batch.len()
        );
        if plan.deferred > 0 {
            tracing::info!(
                "Deferring {} new tickets to a later run (batch limit {})",
                plan.deferred,
                self.settings.batch_limit
            );
        }

        let inserted = self.write_batch(&plan.batch).await?;

        Ok(SyncReport {
            pages_fetched: outcome.pages_fetched,
            walk_complete: outcome.end.is_complete(),
            walk_end: outcome.end.to_string(),
            remote_count: outcome.ids.len(),
            existing_count: local_ids.len(),
            delta_count,
            inserted,
            deferred: plan.deferred,
        })
    }

    /// Cap a delta at the batch limit and store it.
    ///
    /// Returns the number of tickets inserted. An empty delta is a no-op.
    pub async fn persist_new(&self, delta: Vec<TicketId>) -> SyncResult<u64> {
        let plan = BatchPlan::cap(delta, self.settings.batch_limit);
        self.write_batch(&plan.batch).await
    }

    async fn write_batch(&self, batch: &[TicketId]) -> SyncResult<u64> {
        if batch.is_empty() {
            tracing::debug!("No new tickets for {}", self.settings.partition);
            return Ok(0);
        }

        let now = chrono::Utc::now().timestamp();
        let records: Vec<LocalTicket> = batch
            .iter()
            .map(|id| LocalTicket::new(self.settings.partition.clone(), id.clone(), now))
            .collect();

        self.store
            .create_batch(&self.settings.partition, &records)
            .await
            .map_err(SyncError::Persistence)
    }
}
