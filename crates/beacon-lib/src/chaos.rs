//! Chaos-chance configuration
//!
//! The message-composition step injects failures and delays with fixed
//! per-condition probabilities. An operator can point the beacon at a remote
//! flag source that overrides them; the source is polled on a fixed interval
//! and its values cached, so lookups never touch the network. Without a
//! source the hardcoded defaults apply and the system is self-contained.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Per-condition probabilities used by the clerk and the scribe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaosChances {
    /// Chance the clerk is having a break (teapot answer)
    pub break_chance: f64,
    /// Chance the clerk is indisposed (service unavailable)
    pub indisposed_chance: f64,
    /// Chance the scribe drops the pen (long delay)
    pub pen_drop_chance: f64,
}

impl Default for ChaosChances {
    fn default() -> Self {
        Self {
            break_chance: 0.01,
            indisposed_chance: 0.03,
            pen_drop_chance: 0.01,
        }
    }
}

/// Remote flag payload; absent fields keep their default
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChanceOverrides {
    break_chance: Option<f64>,
    indisposed_chance: Option<f64>,
    pen_drop_chance: Option<f64>,
}

impl ChanceOverrides {
    fn merge_over(self, base: ChaosChances) -> ChaosChances {
        ChaosChances {
            break_chance: self.break_chance.unwrap_or(base.break_chance),
            indisposed_chance: self.indisposed_chance.unwrap_or(base.indisposed_chance),
            pen_drop_chance: self.pen_drop_chance.unwrap_or(base.pen_drop_chance),
        }
    }
}

/// Cheap, cloneable access to the current chances
#[derive(Clone)]
pub struct ChanceProvider {
    rx: watch::Receiver<ChaosChances>,
}

impl ChanceProvider {
    /// Provider pinned to the hardcoded defaults, with no remote source
    pub fn fixed() -> Self {
        Self::pinned(ChaosChances::default())
    }

    /// Provider pinned to explicit chances, with no remote source
    pub fn pinned(chances: ChaosChances) -> Self {
        let (_tx, rx) = watch::channel(chances);
        Self { rx }
    }

    /// Provider backed by a remote flag source polled at `period`
    pub fn with_remote(url: String, period: Duration) -> (Self, ChanceRefresher) {
        let (tx, rx) = watch::channel(ChaosChances::default());
        (
            Self { rx },
            ChanceRefresher {
                url,
                period,
                client: reqwest::Client::new(),
                tx,
            },
        )
    }

    /// The chances currently in effect
    pub fn current(&self) -> ChaosChances {
        *self.rx.borrow()
    }
}

/// Background task polling the remote flag source
pub struct ChanceRefresher {
    url: String,
    period: Duration,
    client: reqwest::Client,
    tx: watch::Sender<ChaosChances>,
}

impl ChanceRefresher {
    /// Default poll period for the remote source
    pub const DEFAULT_PERIOD: Duration = Duration::from_secs(30);

    /// Run until shutdown; fetch failures keep the last known chances
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(url = %self.url, period_secs = self.period.as_secs(), "Starting chaos-chance refresher");

        let mut ticker = interval(self.period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.fetch().await {
                        Ok(overrides) => {
                            let chances = overrides.merge_over(ChaosChances::default());
                            debug!(?chances, "Refreshed chaos chances");
                            self.tx.send_replace(chances);
                        }
                        Err(e) => {
                            warn!(error = %e, "Could not refresh chaos chances, keeping current values");
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down chaos-chance refresher");
                    break;
                }
            }
        }
    }

    async fn fetch(&self) -> anyhow::Result<ChanceOverrides> {
        let response = self.client.get(&self.url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}
