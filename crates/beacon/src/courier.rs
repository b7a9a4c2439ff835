//! The nimble courier checks the remote clock

use anyhow::{Context, Result};
use beacon_lib::ClockReading;
use tracing::debug;

/// Fetch the current reading from a remote clock beacon
pub async fn check_clock(client: &reqwest::Client, clock: &str) -> Result<ClockReading> {
    debug!(clock, "Courier checking the clock 🐦");

    let response = client
        .get(format!("{clock}/timestamp"))
        .send()
        .await
        .context("Error checking clock!")?
        .error_for_status()
        .context("Clock answered with an error status")?;

    response
        .json::<ClockReading>()
        .await
        .context("Could not read the clock's answer")
}
