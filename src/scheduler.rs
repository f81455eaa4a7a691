use crate::sync::discovery::Discoverer;
use crate::sync::ResourceSynchronizer;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

/// Start periodic re-sync on a cron schedule.
///
/// `schedule` uses the six-field format ("sec min hour day month weekday"),
/// e.g. `"0 */30 * * * *"` for every half hour.
pub async fn start_scheduler(
    schedule: &str,
    synchronizer: Arc<ResourceSynchronizer>,
    resources: Arc<dyn Discoverer>,
    models: Arc<dyn Discoverer>,
) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    info!("Scheduling resource sync (cron: {})", schedule);
    let job = Job::new_async(schedule, move |_uuid, _l| {
        let synchronizer = Arc::clone(&synchronizer);
        let resources = Arc::clone(&resources);
        let models = Arc::clone(&models);

        Box::pin(async move {
            info!("⏰ Scheduled sync triggered");
            match synchronizer.discover_and_register(resources, models).await {
                Ok(report) if report.is_complete() => {
                    info!("✓ Scheduled sync completed ({} resources)", report.discovered)
                }
                Ok(report) => error!(
                    "Scheduled sync left {} batches unapplied",
                    report.failed_batches.len()
                ),
                Err(e) => error!("Scheduled sync failed: {:#}", e),
            }
        })
    })
    .with_context(|| format!("Invalid SYNC_SCHEDULE: {}", schedule))?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    info!("✓ Scheduler started");

    Ok(scheduler)
}
