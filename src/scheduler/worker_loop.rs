use anyhow::Result;
use std::{sync::Arc, time::Duration};
use tracing::{error, info};

use crate::application::usecases::renewals::RenewalUseCase;

/// Daily cadence: due renewals, trial expiry, and reminder notifications.
pub async fn run_renewal_loop(renewals: Arc<RenewalUseCase>, interval_secs: u64) -> Result<()> {
    loop {
        run_daily_sweeps(&renewals).await;
        tokio::time::sleep(Duration::from_secs(interval_secs)).await;
    }
}

/// Frequent cadence: overdue retries and failed-subscription expiry.
pub async fn run_retry_loop(renewals: Arc<RenewalUseCase>, interval_secs: u64) -> Result<()> {
    loop {
        run_retry_sweeps(&renewals).await;
        tokio::time::sleep(Duration::from_secs(interval_secs)).await;
    }
}

async fn run_daily_sweeps(renewals: &RenewalUseCase) {
    info!("scheduler: daily sweep starting");

    match renewals.process_due_renewals().await {
        Ok(summary) => {
            info!(
                processed = summary.processed,
                failed = summary.failed,
                "scheduler: due renewals processed"
            );
        }
        Err(e) => error!("Error while processing due renewals: {}", e),
    }

    match renewals.process_expired_trials().await {
        Ok(summary) => {
            info!(
                processed = summary.processed,
                failed = summary.failed,
                "scheduler: expired trials processed"
            );
        }
        Err(e) => error!("Error while processing expired trials: {}", e),
    }

    if let Err(e) = renewals.send_trial_ending_reminders().await {
        error!("Error while sending trial reminders: {}", e);
    }
}

async fn run_retry_sweeps(renewals: &RenewalUseCase) {
    info!("scheduler: retry sweep starting");

    match renewals.retry_overdue().await {
        Ok(summary) => {
            info!(
                processed = summary.processed,
                failed = summary.failed,
                "scheduler: overdue retries processed"
            );
        }
        Err(e) => error!("Error while retrying overdue renewals: {}", e),
    }

    match renewals.expire_stale_failed().await {
        Ok(summary) => {
            info!(
                processed = summary.processed,
                failed = summary.failed,
                "scheduler: stale failed subscriptions expired"
            );
        }
        Err(e) => error!("Error while expiring stale failed subscriptions: {}", e),
    }
}
