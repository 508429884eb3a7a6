//! Background sync task.
//!
//! Runs the sync on a fixed interval. Each tick awaits the previous run, so
//! at most one run is in flight; ticks missed during a long run are skipped.

use crate::service::SyncService;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

/// Spawn the background sync task.
///
/// Returns a handle that can be used to abort the task.
pub fn spawn_sync_task(service: Arc<SyncService>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let config = service.config().sync.clone();
        if !config.enabled {
            tracing::info!("Sync task disabled");
            return;
        }

        let interval_secs = config.interval_secs.max(1);
        tracing::info!(
            "Sync task started (interval: {}s, partition: {})",
            interval_secs,
            service.engine().partition()
        );

        let mut timer = interval(Duration::from_secs(interval_secs));
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            timer.tick().await;

            match service.run_scheduled(Utc::now()).await {
                Ok(Some(report)) => {
                    if report.inserted > 0 {
                        tracing::info!(
                            "Sync: inserted {} tickets ({} deferred)",
                            report.inserted,
                            report.deferred
                        );
                    } else {
                        tracing::debug!("Sync: no new tickets");
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("Sync run failed: {}", e);
                }
            }
        }
    })
}
