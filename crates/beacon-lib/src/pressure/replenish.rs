//! Periodic replenisher
//!
//! Fires a `-1` delta for every counter once per interval for the lifetime
//! of the process. Without it the counters would only ever grow, so a stuck
//! ticker is a correctness failure, not a degradation.

use super::{CounterKind, PressureHandle};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{info, warn};

/// Background task that settles both counters on a fixed interval
pub struct ReplenishScheduler {
    handle: PressureHandle,
    period: Duration,
}

impl ReplenishScheduler {
    /// Default tick period
    pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

    pub fn new(handle: PressureHandle, period: Duration) -> Self {
        Self { handle, period }
    }

    /// Run until shutdown is signalled or the actor goes away
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(period_ms = self.period.as_millis() as u64, "Starting replenish scheduler");

        let mut ticker = interval(self.period);
        // The first tick fires immediately; skip it so the counters are not
        // settled before any load has registered.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for kind in [CounterKind::Grease, CounterKind::Ink] {
                        if let Err(e) = self.handle.apply(kind, -1).await {
                            warn!(error = %e, "Replenish tick could not be delivered");
                            return;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down replenish scheduler");
                    break;
                }
            }
        }
    }
}
