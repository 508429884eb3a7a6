//! # sync-core
//!
//! Pure logic for ticket sync (no I/O, instant tests).
//!
//! This crate holds the parts of the sync engine that are pure functions of
//! their input: the page envelope types, the pagination walk, the delta
//! computation and the batch cap.
//!
//! The actual I/O (HTTP, SQLite, timers) is performed by `sync-worker`,
//! which feeds fetched pages into [`PageWalk`] and persists the
//! [`BatchPlan`] it gets back.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod delta;
pub mod ids;
pub mod page;
pub mod walk;

pub use delta::{compute_delta, BatchPlan, DEFAULT_BATCH_LIMIT};
pub use ids::{IdError, Partition, RawTicketId, TicketId};
pub use page::{PageMeta, RegistrationsPage, Ticket};
pub use walk::{PageWalk, WalkEnd, WalkOutcome, DEFAULT_MAX_PAGES};
