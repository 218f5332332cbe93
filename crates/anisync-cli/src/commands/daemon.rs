use crate::logging;
use crate::output::Output;
use chrono::{FixedOffset, Local, Offset};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use anisync_config::{PathManager, SyncTime};
use anisync_core::SyncService;

/// Runs the daily pass through tokio-cron-scheduler
pub struct Scheduler {
    scheduler: JobScheduler,
    service: Arc<SyncService>,
    sync_time: SyncTime,
    run_on_startup: bool,
}

impl Scheduler {
    pub async fn new(service: Arc<SyncService>, sync_time: SyncTime, run_on_startup: bool) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler,
            service,
            sync_time,
            run_on_startup,
        })
    }

    pub async fn start(&mut self) -> Result<()> {
        if self.run_on_startup {
            info!(
                operation = "scheduler_startup",
                "Running initial sync on startup"
            );
            run_scheduled_pass(&self.service).await;
        }

        // The scheduler fires in UTC, so the local time is converted once here.
        // A DST change shifts the pass by an hour until the daemon restarts.
        let offset = Local::now().offset().fix();
        let schedule = daily_schedule(self.sync_time, offset);
        let service = Arc::clone(&self.service);
        let job = Job::new_async(schedule.as_str(), move |_uuid, _lock| {
            let service = Arc::clone(&service);
            Box::pin(async move {
                run_scheduled_pass(&service).await;
            })
        })?;
        self.scheduler.add(job).await?;
        self.scheduler.start().await?;

        info!(
            operation = "scheduler_started",
            sync_time = %self.sync_time,
            schedule = %schedule,
            "Scheduler started, daily sync at {} local time",
            self.sync_time
        );
        Ok(())
    }

    /// Stop firing new passes and wait for a running one to end
    pub async fn shutdown(&mut self) -> Result<()> {
        self.scheduler.shutdown().await?;
        while self.service.is_running() {
            info!("Waiting for the running sync to finish");
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        Ok(())
    }
}

async fn run_scheduled_pass(service: &SyncService) {
    info!(operation = "scheduled_sync_start", "Starting scheduled sync");
    match service.trigger_sync().await {
        Ok(Some(outcome)) => {
            let report = outcome.report();
            info!(
                operation = "scheduled_sync_complete",
                candidates = report.candidates,
                applied = report.applied,
                failed = report.failed,
                duration_ms = report.duration.as_millis() as u64,
                "Scheduled sync finished"
            );
        }
        Ok(None) => {
            warn!(
                operation = "scheduled_sync_skipped",
                "Previous sync still running, skipping this one"
            );
        }
        Err(e) => {
            error!(
                operation = "scheduled_sync_error",
                error = %e,
                "Scheduled sync failed"
            );
        }
    }
}

/// Six-field cron expression (with seconds) firing daily at `time` in `offset`
fn daily_schedule(time: SyncTime, offset: FixedOffset) -> String {
    let local_minutes = (time.hour * 60 + time.minute) as i32;
    let utc_minutes = (local_minutes - offset.local_minus_utc() / 60).rem_euclid(24 * 60);
    format!("0 {} {} * * *", utc_minutes % 60, utc_minutes / 60)
}

pub async fn run_daemon(
    sync_time_override: Option<String>,
    no_startup_sync: bool,
    verbose: u8,
    quiet: bool,
    output: &Output,
) -> Result<()> {
    let path_manager = PathManager::default();
    logging::init_logging_with_file(verbose, quiet, Some(&path_manager.daemon_log_file()))
        .map_err(|e| eyre!("{}", e))?;

    let config = super::load_config(&path_manager)?;
    let sync_time = match sync_time_override {
        Some(value) => SyncTime::parse(&value)?,
        None => config.scheduler.sync_time,
    };
    let run_on_startup = config.scheduler.run_on_startup && !no_startup_sync;

    let service = Arc::new(super::build_service(&config, &path_manager)?);
    let mut scheduler = Scheduler::new(service, sync_time, run_on_startup).await?;
    scheduler.start().await?;

    output.info(format!(
        "Daemon running, next sync at {} local time. Press Ctrl-C to stop.",
        sync_time
    ));
    output.info(format!(
        "Logs are written to {}",
        path_manager.daemon_log_file().display()
    ));

    tokio::signal::ctrl_c().await?;
    info!(operation = "daemon_shutdown", "Shutting down");
    scheduler.shutdown().await?;
    output.success("Daemon stopped");
    Ok(())
}
