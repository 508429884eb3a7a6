//! Delta computation and batch limiting.
//!
//! The delta is every remote id not already stored locally, deduplicated.
//! Order follows the first occurrence in the remote list so a run is
//! deterministic for a given remote response.

use crate::ids::TicketId;
use std::collections::HashSet;

/// Default number of records the store accepts in one bulk write.
pub const DEFAULT_BATCH_LIMIT: usize = 100;

/// Compute the remote ids that are absent from local state.
pub fn compute_delta(remote_ids: &[TicketId], local_ids: &HashSet<TicketId>) -> Vec<TicketId> {
    let mut seen = HashSet::with_capacity(remote_ids.len());
    remote_ids
        .iter()
        .filter(|id| !local_ids.contains(*id))
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect()
}

/// A delta split at the bulk-write limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    /// Ids to write in this run.
    pub batch: Vec<TicketId>,
    /// Ids left for a later run.
    pub deferred: usize,
}

impl BatchPlan {
    /// Take at most `limit` ids from the delta.
    pub fn cap(mut delta: Vec<TicketId>, limit: usize) -> Self {
        let deferred = delta.len().saturating_sub(limit);
        delta.truncate(limit);
        Self {
            batch: delta,
            deferred,
        }
    }

    /// Whether there is nothing to write.
    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }
}
