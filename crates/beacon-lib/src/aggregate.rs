//! Per-beacon aggregation snapshots
//!
//! Each poll cycle folds the per-pod gauge readings into count/sum/average
//! statistics per beacon, builds a complete new snapshot off to the side and
//! publishes it in one step. Readers hold cheap `Arc` clones and can never
//! observe a half-updated triplet.

use crate::scrape::GaugeKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// Count/sum/average statistics for one (beacon, gauge kind) pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GaugeSample {
    pub count: u64,
    pub sum: f64,
    pub average: f64,
}

impl GaugeSample {
    /// Fold one cycle's successful readings; average is 0 when count is 0
    pub fn from_values(values: &[f64]) -> Self {
        let count = values.len() as u64;
        let sum: f64 = values.iter().sum();
        let average = if count == 0 { 0.0 } else { sum / count as f64 };
        Self {
            count,
            sum,
            average,
        }
    }
}

/// Both gauge samples for one beacon
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BeaconSample {
    pub grease: GaugeSample,
    pub ink: GaugeSample,
}

impl BeaconSample {
    pub fn get(&self, kind: GaugeKind) -> GaugeSample {
        match kind {
            GaugeKind::GreaseBuildup => self.grease,
            GaugeKind::InkDepletion => self.ink,
        }
    }
}

/// What a beacon's sample becomes when a cycle yields zero successful scrapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyCyclePolicy {
    /// Replace with `{0, 0, 0}`
    Zero,
    /// Keep the previous cycle's sample
    HoldLast,
}

impl Default for EmptyCyclePolicy {
    fn default() -> Self {
        EmptyCyclePolicy::Zero
    }
}

/// The aggregate view of the cluster at one poll cycle
///
/// Beacons that disappear from discovery keep their last sample until
/// overwritten or the process restarts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub beacons: HashMap<String, BeaconSample>,
}

impl Snapshot {
    /// Look up a beacon, falling back to the zero-valued default sample
    pub fn sample(&self, beacon: &str) -> BeaconSample {
        self.beacons.get(beacon).copied().unwrap_or_default()
    }

    /// Build the next snapshot from one cycle's per-pod readings
    ///
    /// `cycle` maps beacon name to the per-pod values collected this cycle
    /// for each gauge kind. The previous snapshot supplies samples for
    /// beacons not listed this cycle and, under `HoldLast`, for gauges with
    /// zero successful readings.
    pub fn next_cycle(
        previous: &Snapshot,
        cycle: &HashMap<String, CycleReadings>,
        policy: EmptyCyclePolicy,
    ) -> Snapshot {
        let mut beacons = previous.beacons.clone();

        for (beacon, readings) in cycle {
            let prior = beacons.get(beacon).copied().unwrap_or_default();
            let fold = |values: &[f64], prior: GaugeSample| -> GaugeSample {
                if values.is_empty() && policy == EmptyCyclePolicy::HoldLast {
                    prior
                } else {
                    GaugeSample::from_values(values)
                }
            };
            beacons.insert(
                beacon.clone(),
                BeaconSample {
                    grease: fold(&readings.grease, prior.grease),
                    ink: fold(&readings.ink, prior.ink),
                },
            );
        }

        Snapshot { beacons }
    }
}

/// One cycle's successful per-pod readings for a single beacon
#[derive(Debug, Clone, Default)]
pub struct CycleReadings {
    pub grease: Vec<f64>,
    pub ink: Vec<f64>,
}

impl CycleReadings {
    pub fn push(&mut self, kind: GaugeKind, value: f64) {
        match kind {
            GaugeKind::GreaseBuildup => self.grease.push(value),
            GaugeKind::InkDepletion => self.ink.push(value),
        }
    }
}

/// Writer side of the published snapshot
pub struct SnapshotPublisher {
    tx: watch::Sender<Arc<Snapshot>>,
}

impl SnapshotPublisher {
    /// Create a publisher and a reader over an initially empty snapshot
    pub fn new() -> (Self, SnapshotReader) {
        let (tx, rx) = watch::channel(Arc::new(Snapshot::default()));
        (Self { tx }, SnapshotReader { rx })
    }

    /// The snapshot the readers currently see
    pub fn current(&self) -> Arc<Snapshot> {
        self.tx.borrow().clone()
    }

    /// Replace the published snapshot wholesale
    pub fn publish(&self, snapshot: Snapshot) {
        self.tx.send_replace(Arc::new(snapshot));
    }
}

/// Cheap, cloneable read access to the latest snapshot
#[derive(Clone)]
pub struct SnapshotReader {
    rx: watch::Receiver<Arc<Snapshot>>,
}

impl SnapshotReader {
    pub fn latest(&self) -> Arc<Snapshot> {
        self.rx.borrow().clone()
    }
}
