//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! The expiry sweep is the only time-driven transition in the engine: it
//! moves bookings whose broadcast window elapsed without an acceptance to
//! `EXPIRED`. The sweep never blocks a request path, and every transition it
//! makes is CAS-guarded — a concurrent acceptance always beats it.

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};

use super::deps::EngineDeps;
use crate::domains::dispatch;

/// Builds the sweep's six-field cron expression. A seconds step is only
/// valid in 1..=59, so out-of-range config values are clamped rather than
/// failing scheduler startup.
fn sweep_schedule(secs: u64) -> String {
    format!("*/{} * * * * *", secs.clamp(1, 59))
}

/// Starts the periodic tasks. The returned scheduler must be kept alive for
/// the lifetime of the process.
pub async fn start_scheduler(deps: EngineDeps) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let cadence = deps.config.expiry_sweep_secs.clamp(1, 59);
    let schedule = sweep_schedule(deps.config.expiry_sweep_secs);

    let sweep_deps = deps.clone();
    let sweep_job = Job::new_async(schedule.as_str(), move |_uuid, _lock| {
        let deps = sweep_deps.clone();
        Box::pin(async move {
            match dispatch::actions::expire_stale(&deps).await {
                Ok(0) => {}
                Ok(count) => tracing::info!(count, "expired stale broadcasts"),
                Err(e) => tracing::error!(error = %e, "expiry sweep failed"),
            }
        })
    })?;
    scheduler.add(sweep_job).await?;

    // Hourly housekeeping: drop stream topics nobody listens to anymore
    let prune_deps = deps.clone();
    let prune_job = Job::new_async("0 0 * * * *", move |_uuid, _lock| {
        let deps = prune_deps.clone();
        Box::pin(async move {
            deps.stream_hub.prune().await;
        })
    })?;
    scheduler.add(prune_job).await?;

    scheduler.start().await?;
    tracing::info!(sweep_secs = cadence, "scheduled tasks started");
    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_schedule_clamps_to_a_valid_seconds_step() {
        assert_eq!(sweep_schedule(5), "*/5 * * * * *");
        assert_eq!(sweep_schedule(0), "*/1 * * * * *");
        assert_eq!(sweep_schedule(59), "*/59 * * * * *");
        // A minute-plus cadence would be an invalid seconds field
        assert_eq!(sweep_schedule(120), "*/59 * * * * *");
    }
}
