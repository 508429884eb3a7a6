//! `/health` reports whether the worker is syncing and how the last run went.
//!
//! The process being up is not enough: a worker whose last run failed is
//! reported as `degraded` so a liveness check can tell a stuck sync from a live one.

use crate::service::{RunRecord, SyncService};
use axum::{Extension, Json};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

static STARTED_AT: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Record process start for the uptime figure. Later calls are no-ops.
pub fn init_start_time() {
    STARTED_AT.get_or_init(Instant::now);
}

/// Body of the `/health` response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// `ok`, `degraded` (last run failed) or `idle` (scheduled sync disabled).
    pub status: &'static str,
    /// Worker version.
    pub version: &'static str,
    /// Conference instance tickets are stored under.
    pub partition: String,
    /// Whether the scheduled sync is running.
    pub sync_enabled: bool,
    /// Seconds since start.
    pub uptime_seconds: u64,
    /// Outcome of the most recent run.
    pub last_run: Option<RunRecord>,
}

fn overall_status(sync_enabled: bool, last_run: Option<&RunRecord>) -> &'static str {
    match (sync_enabled, last_run) {
        (false, _) => "idle",
        (true, Some(RunRecord::Failed { .. })) => "degraded",
        (true, _) => "ok",
    }
}

/// `GET /health`
pub async fn health_handler(Extension(service): Extension<Arc<SyncService>>) -> Json<HealthStatus> {
    let sync_enabled = service.config().sync.enabled;
    let last_run = service.last_run().await;

    Json(HealthStatus {
        status: overall_status(sync_enabled, last_run.as_ref()),
        version: env!("CARGO_PKG_VERSION"),
        partition: service.engine().partition().to_string(),
        sync_enabled,
        uptime_seconds: STARTED_AT.get().map_or(0, |t| t.elapsed().as_secs()),
        last_run,
    })
}
