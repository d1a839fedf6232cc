//! Periodic reclamation of expired cache entries, old rate-limit records and
//! completed checkpoints, plus recovery of abandoned checkpoint claims.
//!
//! Failures are logged and counted but never stop the loop.

use std::sync::Arc;
use std::time::Duration;

use finintel_telemetry::Metrics;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cache::CacheStore;
use crate::checkpoint::CheckpointStore;
use crate::rate_limit::RateLimiter;

/// `[maintenance]` config section.
#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// How long a completed checkpoint is kept after it was decided.
    #[serde(default = "default_checkpoint_retention_secs")]
    pub checkpoint_retention_secs: u64,
    /// A claim older than this is treated as abandoned.
    #[serde(default = "default_checkpoint_lease_secs")]
    pub checkpoint_lease_secs: u64,
}

fn default_interval_secs() -> u64 {
    300
}

fn default_checkpoint_retention_secs() -> u64 {
    86_400
}

fn default_checkpoint_lease_secs() -> u64 {
    300
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            checkpoint_retention_secs: default_checkpoint_retention_secs(),
            checkpoint_lease_secs: default_checkpoint_lease_secs(),
        }
    }
}

/// Rows reclaimed by one sweep. `None` means that step failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    pub cache_entries_removed: Option<usize>,
    pub rate_limit_records_removed: Option<usize>,
    pub checkpoints_removed: Option<usize>,
    pub checkpoints_recovered: Option<usize>,
}

#[derive(Clone)]
pub struct MaintenanceTask {
    cache: Arc<CacheStore>,
    limiter: Arc<RateLimiter>,
    checkpoints: Arc<CheckpointStore>,
    interval: Duration,
    checkpoint_retention: Duration,
    checkpoint_lease: Duration,
}

impl MaintenanceTask {
    pub fn new(
        cache: Arc<CacheStore>,
        limiter: Arc<RateLimiter>,
        checkpoints: Arc<CheckpointStore>,
        config: &MaintenanceConfig,
    ) -> Self {
        Self {
            cache,
            limiter,
            checkpoints,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            checkpoint_retention: Duration::from_secs(config.checkpoint_retention_secs),
            checkpoint_lease: Duration::from_secs(config.checkpoint_lease_secs),
        }
    }

    /// Run every sweep once on the calling thread.
    pub fn run_once(&self) -> MaintenanceReport {
        let cache_entries_removed = match self.cache.sweep_expired() {
            Ok(n) => {
                Metrics::maintenance_reclaimed("ticker_cache", n);
                Some(n)
            }
            Err(e) => {
                warn!(error = %e, "Cache sweep failed");
                None
            }
        };
        let rate_limit_records_removed = match self.limiter.purge_expired() {
            Ok(n) => {
                Metrics::maintenance_reclaimed("rate_limits", n);
                Some(n)
            }
            Err(e) => {
                warn!(error = %e, "Rate-limit purge failed");
                None
            }
        };

        let checkpoints_removed = match self
            .checkpoints
            .purge_completed_older_than(self.checkpoint_retention)
        {
            Ok(n) => {
                Metrics::maintenance_reclaimed("pipeline_checkpoints", n);
                Some(n)
            }
            Err(e) => {
                warn!(error = %e, "Checkpoint purge failed");
                None
            }
        };
        let checkpoints_recovered = match self.checkpoints.recover_stale(self.checkpoint_lease) {
            Ok(n) => Some(n),
            Err(e) => {
                warn!(error = %e, "Checkpoint recovery failed");
                None
            }
        };

        let report = MaintenanceReport {
            cache_entries_removed,
            rate_limit_records_removed,
            checkpoints_removed,
            checkpoints_recovered,
        };
        info!(
            cache_entries_removed = ?report.cache_entries_removed,
            rate_limit_records_removed = ?report.rate_limit_records_removed,
            checkpoints_removed = ?report.checkpoints_removed,
            checkpoints_recovered = ?report.checkpoints_recovered,
            "Maintenance sweep completed"
        );
        report
    }

    /// Sweep on every interval tick until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        info!(interval_secs = self.interval.as_secs(), "Maintenance task started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let task = self.clone();
                    if let Err(e) = tokio::task::spawn_blocking(move || task.run_once()).await {
                        warn!(error = %e, "Maintenance sweep panicked");
                    }
                }
                () = shutdown.cancelled() => {
                    info!("Maintenance task stopped");
                    return;
                }
            }
        }
    }
}
