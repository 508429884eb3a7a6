//! Sync service coordination.
//!
//! `SyncService` owns the configuration, the store and the engine, applies
//! the cut-off gate and run deadline around each engine run, and records
//! metrics for the HTTP endpoints.

use crate::config::Config;
use crate::engine::{EngineSettings, SyncEngine, SyncReport};
use crate::error::{Result, SyncError, SyncResult};
use crate::remote::TitoClient;
use crate::storage::SqliteStorage;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Operational metrics for monitoring sync activity.
///
/// All counters are monotonically increasing (reset only on restart).
#[derive(Debug, Default)]
pub struct SyncMetrics {
    /// Runs started (gate passed).
    pub runs_total: AtomicU64,
    /// Runs that failed (local store error or deadline).
    pub runs_failed: AtomicU64,
    /// Runs skipped because the cut-off had passed.
    pub runs_skipped: AtomicU64,
    /// Runs whose walk ended on a remote failure.
    pub remote_failures: AtomicU64,
    /// Tickets inserted since startup.
    pub tickets_inserted: AtomicU64,
    /// Unix timestamp of the last finished run (0 if none).
    pub last_run_unix: AtomicU64,
}

/// Outcome of the most recent scheduled run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunRecord {
    /// The run completed.
    Completed {
        /// When the run finished.
        finished_at: DateTime<Utc>,
        /// What the run did.
        report: SyncReport,
    },
    /// The run failed.
    Failed {
        /// When the run finished.
        finished_at: DateTime<Utc>,
        /// Why it failed.
        error: String,
    },
    /// The run was refused by the cut-off gate.
    Skipped {
        /// When the run was refused.
        at: DateTime<Utc>,
    },
}

/// Main sync service.
pub struct SyncService {
    config: Config,
    storage: Arc<SqliteStorage>,
    engine: Arc<SyncEngine>,
    metrics: SyncMetrics,
    last_run: RwLock<Option<RunRecord>>,
}

impl std::fmt::Debug for SyncService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncService")
            .field("engine", &self.engine)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl SyncService {
    /// Create a new SyncService with the given config, storage and engine.
    pub fn new(config: Config, storage: Arc<SqliteStorage>, engine: SyncEngine) -> Self {
        Self {
            config,
            storage,
            engine: Arc::new(engine),
            metrics: SyncMetrics::default(),
            last_run: RwLock::new(None),
        }
    }

    /// Open the store, build the Tito client and wire up the engine.
    pub async fn from_config(config: Config) -> Result<Self> {
        let partition = config.partition()?;
        let storage = SqliteStorage::new(&config.storage.database)
            .await?
            .with_batch_limit(config.storage.batch_limit);
        let storage = Arc::new(storage);

        let client = TitoClient::new(&config.tito)?;
        tracing::info!("Syncing from {}", client.registrations_url());

        let settings = EngineSettings {
            partition,
            batch_limit: config.storage.batch_limit,
            max_pages: config.tito.max_pages,
        };
        let engine = SyncEngine::new(Arc::new(client), storage.clone(), settings);
        Ok(Self::new(config, storage, engine))
    }

    /// Get the service configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get access to the storage layer.
    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Get access to the engine.
    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Get access to the operational metrics.
    pub fn metrics(&self) -> &SyncMetrics {
        &self.metrics
    }

    /// Get the outcome of the most recent run, if any.
    pub async fn last_run(&self) -> Option<RunRecord> {
        self.last_run.read().await.clone()
    }

    /// Run the engine once if the cut-off gate allows it.
    ///
    /// Returns `Ok(None)` when the run was skipped. The run is bounded by
    /// the configured deadline; hitting it abandons the run before anything
    /// is written, or after the single batch write has completed.
    pub async fn run_scheduled(&self, now: DateTime<Utc>) -> SyncResult<Option<SyncReport>> {
        if !self.config.sync.sync_permitted(now) {
            tracing::info!("Tito sync cut-off has passed; skipping run");
            self.metrics.runs_skipped.fetch_add(1, Ordering::Relaxed);
            *self.last_run.write().await = Some(RunRecord::Skipped { at: now });
            return Ok(None);
        }

        self.metrics.runs_total.fetch_add(1, Ordering::Relaxed);
        let deadline = self.config.sync.run_deadline();
        let result = match tokio::time::timeout(deadline, self.engine.run_once()).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::DeadlineExceeded(deadline)),
        };

        let finished_at = Utc::now();
        self.metrics
            .last_run_unix
            .store(finished_at.timestamp().max(0) as u64, Ordering::Relaxed);

        let record = match &result {
            Ok(report) => {
                self.metrics
                    .tickets_inserted
                    .fetch_add(report.inserted, Ordering::Relaxed);
                if !report.walk_complete {
                    self.metrics.remote_failures.fetch_add(1, Ordering::Relaxed);
                }
                RunRecord::Completed {
                    finished_at,
                    report: report.clone(),
                }
            }
            Err(e) => {
                self.metrics.runs_failed.fetch_add(1, Ordering::Relaxed);
                RunRecord::Failed {
                    finished_at,
                    error: e.to_string(),
                }
            }
        };
        *self.last_run.write().await = Some(record);

        result.map(Some)
    }
}
