//! # sync-worker
//!
//! Scheduled worker that keeps a local ticket store in step with the Tito
//! registrations API.
//!
//! Each run:
//! - walks every page of `GET {base}/{account}/{event}/registrations`
//! - subtracts the tickets already stored for the conference instance
//! - writes at most `batch_limit` new tickets in a single batch
//!
//! ## Architecture
//!
//! ```text
//!   Tito API ──pages──► walker ──ids──► engine ──batch──► SQLite
//!                                          ▲
//!                     schedule (interval) ─┘    /health, /metrics (axum)
//! ```
//!
//! Only additions are synced. Tickets removed or edited remotely are left
//! as they are locally.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod remote;
pub mod schedule;
pub mod service;
pub mod storage;
pub mod walker;
