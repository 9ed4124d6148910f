use chrono_tz::Tz;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{info, warn};

use super::runner::{RunOutcome, ScrapeRunner};

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("schedule '{0}' must have 5, 6 or 7 fields")]
    FieldCount(String),
    #[error("schedule '{expression}' was rejected: {source}")]
    Job {
        expression: String,
        source: JobSchedulerError,
    },
    #[error("scheduler failure: {0}")]
    Scheduler(#[from] JobSchedulerError),
}

/// Accepts classic five-field cron and prepends a zero seconds field.
/// Six and seven field expressions pass through unchanged.
pub fn normalize_expression(expression: &str) -> Result<String, SchedulerError> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    match fields.len() {
        5 => Ok(format!("0 {}", fields.join(" "))),
        6 | 7 => Ok(fields.join(" ")),
        _ => Err(SchedulerError::FieldCount(expression.to_string())),
    }
}

/// Registers scheduled runs and starts the scheduler. The expression is
/// evaluated as wall-clock time in `timezone`.
pub async fn start_scheduler(
    runner: Arc<ScrapeRunner>,
    expression: &str,
    timezone: Tz,
) -> Result<JobScheduler, SchedulerError> {
    let cron = normalize_expression(expression)?;
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async_tz(cron.as_str(), timezone, move |_uuid, _lock| {
        let runner = runner.clone();
        Box::pin(async move {
            info!("scheduled run triggered");
            if let RunOutcome::Failed { message } = runner.run_scheduled().await {
                warn!(%message, "scheduled run failed");
            }
        })
    })
    .map_err(|source| SchedulerError::Job {
        expression: cron.clone(),
        source,
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    info!(schedule = %cron, %timezone, "scheduler started");
    Ok(scheduler)
}
