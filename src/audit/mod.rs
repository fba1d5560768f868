//! Background auditors: the periodic signature audit, the periodic expiry
//! sweep, and the staggered startup sequence that brings a cold process in
//! line with live channel state.
//!
//! Each loop sleeps its interval, runs one pass, and on failure logs and
//! sleeps a longer retry backoff before the next attempt. Loops never exit.

use std::sync::Arc;

use tokio::time::{Duration, sleep};
use tracing::{error, info};

use crate::effects::DiscordInterpreter;
use crate::service::PetitionService;

/// Runs the signature audit on its configured interval, forever.
pub async fn run_signature_auditor<I: DiscordInterpreter>(service: Arc<PetitionService<I>>) {
    let interval = service.config().signature_audit_interval;
    let backoff = service.config().signature_retry_backoff;
    loop {
        sleep(interval).await;
        if let Err(e) = service.run_signature_audit().await {
            error!(error = %e, "signature audit failed");
            sleep(backoff).await;
        }
    }
}

/// Runs the expiry sweep on its configured interval, forever.
pub async fn run_expiry_auditor<I: DiscordInterpreter>(service: Arc<PetitionService<I>>) {
    let interval = service.config().expiry_sweep_interval;
    let backoff = service.config().expiry_retry_backoff;
    loop {
        sleep(interval).await;
        if let Err(e) = service.run_expiry_sweep().await {
            error!(error = %e, "expiry sweep failed");
            sleep(backoff).await;
        }
    }
}

/// Startup sequence: spawn both auditor loops, then run the repair pass and
/// one immediate round of each sweep, with short pauses so the burst of
/// REST traffic is spread out.
pub async fn staggered_startup<I: DiscordInterpreter + 'static>(service: Arc<PetitionService<I>>) {
    info!("starting petition background tasks");

    tokio::spawn(run_expiry_auditor(Arc::clone(&service)));
    sleep(Duration::from_secs(2)).await;

    tokio::spawn(run_signature_auditor(Arc::clone(&service)));
    sleep(Duration::from_secs(3)).await;

    if let Err(e) = service.repair_all().await {
        error!(error = %e, "startup repair pass failed");
    }
    sleep(Duration::from_secs(5)).await;

    if let Err(e) = service.run_expiry_sweep().await {
        error!(error = %e, "startup expiry sweep failed");
    }
    sleep(Duration::from_secs(3)).await;

    if let Err(e) = service.run_signature_audit().await {
        error!(error = %e, "startup signature audit failed");
    }

    info!("petition startup sequence complete");
}
