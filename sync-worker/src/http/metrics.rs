//! Prometheus metrics endpoint.

use crate::service::SyncService;
use crate::storage::TicketStore;
use axum::{http::header::CONTENT_TYPE, response::IntoResponse, Extension};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Prometheus metrics handler.
///
/// Returns metrics in Prometheus text format.
/// Includes both gauges (current state) and counters (monotonic since startup).
pub async fn metrics_handler(Extension(service): Extension<Arc<SyncService>>) -> impl IntoResponse {
    let m = service.metrics();

    // Counters — monotonic since startup
    let runs = m.runs_total.load(Ordering::Relaxed);
    let failed = m.runs_failed.load(Ordering::Relaxed);
    let skipped = m.runs_skipped.load(Ordering::Relaxed);
    let remote_failures = m.remote_failures.load(Ordering::Relaxed);
    let inserted = m.tickets_inserted.load(Ordering::Relaxed);
    let last_run = m.last_run_unix.load(Ordering::Relaxed);

    // Storage stats (async query — best effort)
    let stored = service
        .storage()
        .count(service.engine().partition())
        .await
        .unwrap_or(0);

    let body = format!(
        r#"# HELP ticketsync_info Worker information
# TYPE ticketsync_info gauge
ticketsync_info{{version="{version}"}} 1

# HELP ticketsync_runs_total Total sync runs started
# TYPE ticketsync_runs_total counter
ticketsync_runs_total {runs}

# HELP ticketsync_runs_failed_total Total sync runs that failed
# TYPE ticketsync_runs_failed_total counter
ticketsync_runs_failed_total {failed}

# HELP ticketsync_runs_skipped_total Total sync runs skipped after the cut-off
# TYPE ticketsync_runs_skipped_total counter
ticketsync_runs_skipped_total {skipped}

# HELP ticketsync_remote_failures_total Total runs whose page walk ended early
# TYPE ticketsync_remote_failures_total counter
ticketsync_remote_failures_total {remote_failures}

# HELP ticketsync_tickets_inserted_total Total tickets inserted since startup
# TYPE ticketsync_tickets_inserted_total counter
ticketsync_tickets_inserted_total {inserted}

# HELP ticketsync_tickets_stored Tickets currently stored for the partition
# TYPE ticketsync_tickets_stored gauge
ticketsync_tickets_stored {stored}

# HELP ticketsync_last_run_timestamp_seconds Unix time of the last finished run
# TYPE ticketsync_last_run_timestamp_seconds gauge
ticketsync_last_run_timestamp_seconds {last_run}
"#,
        version = env!("CARGO_PKG_VERSION"),
    );

    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}
