//! # Sync Scheduler
//!
//! Background loop that triggers a full scheduled sync at a fixed interval
//! and prunes old sync logs once a day. One loop per process; per-task
//! overlap protection lives in the engine, so a manual API run racing a
//! scheduled run is refused there, not here.

use std::sync::Arc;

use metrics::{counter, histogram};
use tokio::time::{Duration as TokioDuration, Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::config::AppConfig;
use crate::engine::SyncEngine;
use crate::repositories::SyncLogRepository;

/// Background scheduler service.
pub struct SyncScheduler {
    config: Arc<AppConfig>,
    engine: Arc<SyncEngine>,
    logs: SyncLogRepository,
}

impl SyncScheduler {
    /// Create a new scheduler instance.
    pub fn new(config: Arc<AppConfig>, engine: Arc<SyncEngine>, logs: SyncLogRepository) -> Self {
        Self {
            config,
            engine,
            logs,
        }
    }

    /// Run the scheduler loop until the provided shutdown token fires.
    #[instrument(skip_all)]
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_seconds = self.config.scheduler.sync_interval_seconds,
            "Starting sync scheduler"
        );
        let tick_interval = TokioDuration::from_secs(self.config.scheduler.sync_interval_seconds);
        let cleanup_interval =
            TokioDuration::from_secs(self.config.scheduler.cleanup_interval_seconds);
        let mut last_cleanup = Instant::now();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Sync scheduler shutdown requested");
                    break;
                }
                _ = sleep(tick_interval) => {
                    let tick_started = Instant::now();
                    self.tick().await;
                    histogram!("wp_sync_scheduler_tick_duration_seconds")
                        .record(tick_started.elapsed().as_secs_f64());

                    if last_cleanup.elapsed() >= cleanup_interval {
                        self.cleanup().await;
                        last_cleanup = Instant::now();
                    }
                }
            }
        }

        info!("Sync scheduler stopped");
    }

    async fn tick(&self) {
        match self.engine.run_scheduled_sync().await {
            Ok(batch) => {
                counter!("wp_sync_scheduler_ticks_total", "outcome" => "ok").increment(1);
                if !batch.results.is_empty() {
                    info!(
                        succeeded = batch.succeeded(),
                        failed = batch.failed(),
                        "Scheduled sync tick completed"
                    );
                }
            }
            Err(err) => {
                counter!("wp_sync_scheduler_ticks_total", "outcome" => "error").increment(1);
                error!(error = %err, "Scheduled sync tick failed");
            }
        }
    }

    async fn cleanup(&self) {
        match self
            .logs
            .cleanup_older_than(self.config.scheduler.log_retention_days)
            .await
        {
            Ok(removed) => {
                counter!("wp_sync_logs_cleaned_total").increment(removed);
            }
            Err(err) => {
                error!(error = %err, "Sync log cleanup failed");
            }
        }
    }
}
