//! Single-writer actor owning the pressure counters
//!
//! All mutations flow through one ordered mpsc queue so increments and
//! decrements never race. Current levels are published through a watch
//! channel as an immutable value; readers never block the writer and never
//! observe a torn update.

use crate::observability::BeaconMetrics;
use anyhow::Result;
use rand::Rng;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info};

/// The two simulated resources tracked per beacon instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterKind {
    /// Grease buildup, gating the `/timestamp` endpoint
    Grease,
    /// Ink depletion, gating the `/telegram` endpoint
    Ink,
}

impl CounterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterKind::Grease => "grease",
            CounterKind::Ink => "ink",
        }
    }
}

/// A signed unit change for one counter, consumed exactly once by the actor
#[derive(Debug, Clone, Copy)]
pub struct Delta {
    pub target: CounterKind,
    /// +1 or -1; anything else is ignored by the actor
    pub amount: i64,
}

/// Current counter values, published wholesale on every applied change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PressureLevels {
    pub grease: i64,
    pub ink: i64,
}

impl PressureLevels {
    pub fn get(&self, kind: CounterKind) -> i64 {
        match kind {
            CounterKind::Grease => self.grease,
            CounterKind::Ink => self.ink,
        }
    }
}

/// Configuration for the pressure actor
#[derive(Debug, Clone)]
pub struct PressureActorConfig {
    /// Probability that a grease `+1` actually registers (models uneven load)
    pub grease_register_chance: f64,
    /// Depth of the delta queue
    pub queue_depth: usize,
}

impl Default for PressureActorConfig {
    fn default() -> Self {
        Self {
            grease_register_chance: 0.5,
            queue_depth: 256,
        }
    }
}

/// Cloneable handle for submitting deltas and reading current levels
#[derive(Clone)]
pub struct PressureHandle {
    delta_tx: mpsc::Sender<Delta>,
    levels_rx: watch::Receiver<PressureLevels>,
}

impl PressureHandle {
    /// Enqueue a signed unit change; applied in receipt order by the actor
    pub async fn apply(&self, target: CounterKind, amount: i64) -> Result<()> {
        self.delta_tx
            .send(Delta { target, amount })
            .await
            .map_err(|_| anyhow::anyhow!("pressure actor is gone"))
    }

    /// Read the current value of one counter without blocking the writer
    pub fn read(&self, kind: CounterKind) -> i64 {
        self.levels_rx.borrow().get(kind)
    }

    /// Read both counters as one consistent value
    pub fn levels(&self) -> PressureLevels {
        *self.levels_rx.borrow()
    }
}

/// The single-writer task that owns both counters
pub struct PressureActor {
    config: PressureActorConfig,
    delta_rx: mpsc::Receiver<Delta>,
    levels_tx: watch::Sender<PressureLevels>,
    levels: PressureLevels,
    metrics: BeaconMetrics,
}

impl PressureActor {
    /// Create the actor and its handle
    pub fn new(config: PressureActorConfig, metrics: BeaconMetrics) -> (Self, PressureHandle) {
        let (delta_tx, delta_rx) = mpsc::channel(config.queue_depth);
        let (levels_tx, levels_rx) = watch::channel(PressureLevels::default());

        let actor = Self {
            config,
            delta_rx,
            levels_tx,
            levels: PressureLevels::default(),
            metrics,
        };

        (
            actor,
            PressureHandle {
                delta_tx,
                levels_rx,
            },
        )
    }

    /// Run until the delta queue closes or shutdown is signalled
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            grease_register_chance = self.config.grease_register_chance,
            "Starting pressure actor"
        );

        loop {
            tokio::select! {
                delta = self.delta_rx.recv() => {
                    match delta {
                        Some(delta) => self.apply(delta),
                        None => {
                            debug!("Delta queue closed");
                            break;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("Shutting down pressure actor");
                    break;
                }
            }
        }
    }

    /// Apply one delta: floor at zero, grease increments register
    /// probabilistically, ink increments always register
    fn apply(&mut self, delta: Delta) {
        let value = match delta.target {
            CounterKind::Grease => &mut self.levels.grease,
            CounterKind::Ink => &mut self.levels.ink,
        };

        match delta.amount {
            -1 if *value > 0 => *value -= 1,
            1 => {
                let registers = delta.target != CounterKind::Grease
                    || rand::thread_rng().gen::<f64>() < self.config.grease_register_chance;
                if registers {
                    *value += 1;
                }
            }
            _ => {}
        }

        self.metrics.set_grease_buildup(self.levels.grease);
        self.metrics.set_ink_depletion(self.levels.ink);
        // Publish the full pair in one step
        self.levels_tx.send_replace(self.levels);
    }
}
