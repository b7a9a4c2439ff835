//! The poll cycle
//!
//! Discovers peer beacons, scrapes their pods, folds the readings into the
//! next snapshot and publishes it in one step, then sleeps until the next
//! tick. One pod failing to answer only drops that pod's reading; a failed
//! cluster query abandons the cycle and the loop retries on the next tick.

use crate::discovery::PeerLister;
use crate::scraper::GaugeSource;
use beacon_lib::{CycleReadings, EmptyCyclePolicy, Snapshot, SnapshotPublisher, SnapshotReader};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Configuration for the poll cycle
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Period between cycles (default: 5 seconds)
    pub period: Duration,
    /// What an empty cycle does to a beacon's sample
    pub empty_cycle_policy: EmptyCyclePolicy,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(5),
            empty_cycle_policy: EmptyCyclePolicy::default(),
        }
    }
}

/// The discover/scrape/aggregate loop
pub struct GearPoller {
    lister: Arc<dyn PeerLister>,
    source: Arc<dyn GaugeSource>,
    publisher: SnapshotPublisher,
    config: PollerConfig,
}

impl GearPoller {
    /// Create a poller and the reader over the snapshots it will publish
    pub fn new(
        lister: Arc<dyn PeerLister>,
        source: Arc<dyn GaugeSource>,
        config: PollerConfig,
    ) -> (Self, SnapshotReader) {
        let (publisher, reader) = SnapshotPublisher::new();
        (
            Self {
                lister,
                source,
                publisher,
                config,
            },
            reader,
        )
    }

    /// Run until shutdown
    pub async fn run(self, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        info!(
            period_secs = self.config.period.as_secs(),
            "Starting gear poll loop"
        );

        let mut ticker = interval(self.config.period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.cycle().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down gear poll loop");
                    break;
                }
            }
        }
    }

    /// One full discover/scrape/aggregate pass
    pub async fn cycle(&self) {
        let beacons = match self.lister.beacons().await {
            Ok(beacons) => beacons,
            Err(e) => {
                warn!(error = %e, "Discovery failed, retrying next tick");
                return;
            }
        };

        let mut cycle: HashMap<String, CycleReadings> = HashMap::new();
        let mut scrape_errors = 0usize;

        for beacon in beacons {
            let addresses = match self.lister.pod_addresses(&beacon).await {
                Ok(addresses) => addresses,
                Err(e) => {
                    // Leave the beacon out of the cycle so its last sample stands
                    warn!(beacon = %beacon, error = %e, "Pod listing failed, keeping last sample");
                    continue;
                }
            };

            let mut readings = CycleReadings::default();
            for address in addresses {
                match self.source.fetch_gauges(&address).await {
                    Ok(gauges) => {
                        for gauge in gauges {
                            readings.push(gauge.kind, gauge.value);
                        }
                    }
                    Err(e) => {
                        scrape_errors += 1;
                        warn!(beacon = %beacon, address = %address, error = %e, "Can't reach pod, skipping");
                    }
                }
            }
            cycle.insert(beacon, readings);
        }

        let next = Snapshot::next_cycle(
            &self.publisher.current(),
            &cycle,
            self.config.empty_cycle_policy,
        );
        debug!(
            beacons = cycle.len(),
            scrape_errors, "Publishing aggregated snapshot"
        );
        self.publisher.publish(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use beacon_lib::{GaugeKind, GaugeValue};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Fixed beacon/pod topology
    struct MockLister {
        beacons: Vec<String>,
        pods: HashMap<String, Vec<String>>,
        fail_discovery: bool,
    }

    #[async_trait]
    impl PeerLister for MockLister {
        async fn beacons(&self) -> Result<Vec<String>> {
            if self.fail_discovery {
                return Err(anyhow!("api server unreachable"));
            }
            Ok(self.beacons.clone())
        }

        async fn pod_addresses(&self, beacon: &str) -> Result<Vec<String>> {
            Ok(self.pods.get(beacon).cloned().unwrap_or_default())
        }
    }

    /// Per-address canned gauge readings; absent addresses fail the scrape
    struct MockSource {
        readings: Mutex<HashMap<String, Vec<GaugeValue>>>,
    }

    impl MockSource {
        fn new(readings: HashMap<String, Vec<GaugeValue>>) -> Self {
            Self {
                readings: Mutex::new(readings),
            }
        }
    }

    #[async_trait]
    impl GaugeSource for MockSource {
        async fn fetch_gauges(&self, address: &str) -> Result<Vec<GaugeValue>> {
            self.readings
                .lock()
                .unwrap()
                .get(address)
                .cloned()
                .ok_or_else(|| anyhow!("connection refused"))
        }
    }

    fn gauges(grease: f64, ink: f64) -> Vec<GaugeValue> {
        vec![
            GaugeValue {
                kind: GaugeKind::GreaseBuildup,
                value: grease,
            },
            GaugeValue {
                kind: GaugeKind::InkDepletion,
                value: ink,
            },
        ]
    }

    fn poller_with(
        lister: MockLister,
        source: MockSource,
        policy: EmptyCyclePolicy,
    ) -> (GearPoller, SnapshotReader) {
        GearPoller::new(
            Arc::new(lister),
            Arc::new(source),
            PollerConfig {
                period: Duration::from_millis(5),
                empty_cycle_policy: policy,
            },
        )
    }

    #[tokio::test]
    async fn test_cycle_aggregates_across_pods() {
        let lister = MockLister {
            beacons: vec!["gildedgateway".to_string()],
            pods: HashMap::from([(
                "gildedgateway".to_string(),
                vec!["10.0.0.1".to_string(), "10.0.0.2".to_string(), "10.0.0.3".to_string()],
            )]),
            fail_discovery: false,
        };
        let source = MockSource::new(HashMap::from([
            ("10.0.0.1".to_string(), gauges(10.0, 1.0)),
            ("10.0.0.2".to_string(), gauges(20.0, 2.0)),
            ("10.0.0.3".to_string(), gauges(30.0, 3.0)),
        ]));

        let (poller, reader) = poller_with(lister, source, EmptyCyclePolicy::Zero);
        poller.cycle().await;

        let sample = reader.latest().sample("gildedgateway");
        assert_eq!(sample.grease.count, 3);
        assert_eq!(sample.grease.sum, 60.0);
        assert_eq!(sample.grease.average, 20.0);
        assert_eq!(sample.ink.sum, 6.0);
    }

    #[tokio::test]
    async fn test_unreachable_pod_is_skipped_not_fatal() {
        let lister = MockLister {
            beacons: vec!["gildedgateway".to_string()],
            pods: HashMap::from([(
                "gildedgateway".to_string(),
                vec!["10.0.0.1".to_string(), "10.0.0.2".to_string(), "10.0.0.3".to_string()],
            )]),
            fail_discovery: false,
        };
        // 10.0.0.2 has no canned answer and times out
        let source = MockSource::new(HashMap::from([
            ("10.0.0.1".to_string(), gauges(10.0, 1.0)),
            ("10.0.0.3".to_string(), gauges(30.0, 3.0)),
        ]));

        let (poller, reader) = poller_with(lister, source, EmptyCyclePolicy::Zero);
        poller.cycle().await;

        let sample = reader.latest().sample("gildedgateway");
        assert_eq!(sample.grease.count, 2);
        assert_eq!(sample.grease.average, 20.0);
    }

    #[tokio::test]
    async fn test_failed_discovery_keeps_previous_snapshot() {
        let lister = MockLister {
            beacons: vec!["velvettimepiece".to_string()],
            pods: HashMap::from([(
                "velvettimepiece".to_string(),
                vec!["10.0.0.9".to_string()],
            )]),
            fail_discovery: false,
        };
        let source = MockSource::new(HashMap::from([(
            "10.0.0.9".to_string(),
            gauges(42.0, 7.0),
        )]));
        let (poller, reader) = poller_with(lister, source, EmptyCyclePolicy::Zero);
        poller.cycle().await;
        assert_eq!(reader.latest().sample("velvettimepiece").grease.sum, 42.0);

        let failing = MockLister {
            beacons: vec![],
            pods: HashMap::new(),
            fail_discovery: true,
        };
        let empty = MockSource::new(HashMap::new());
        let failing_poller = GearPoller {
            lister: Arc::new(failing),
            source: Arc::new(empty),
            publisher: poller.publisher,
            config: poller.config,
        };
        failing_poller.cycle().await;

        // Snapshot untouched by the failed cycle
        assert_eq!(reader.latest().sample("velvettimepiece").grease.sum, 42.0);
    }

    #[tokio::test]
    async fn test_beacon_with_all_pods_down_follows_policy() {
        let lister = || MockLister {
            beacons: vec!["gaslightparlour".to_string()],
            pods: HashMap::from([(
                "gaslightparlour".to_string(),
                vec!["10.0.0.5".to_string()],
            )]),
            fail_discovery: false,
        };

        // First cycle sees the pod, second cycle cannot reach it
        let (poller, reader) = poller_with(
            lister(),
            MockSource::new(HashMap::from([(
                "10.0.0.5".to_string(),
                gauges(50.0, 5.0),
            )])),
            EmptyCyclePolicy::HoldLast,
        );
        poller.cycle().await;

        let holding = GearPoller {
            lister: Arc::new(lister()),
            source: Arc::new(MockSource::new(HashMap::new())),
            publisher: poller.publisher,
            config: poller.config,
        };
        holding.cycle().await;

        let sample = reader.latest().sample("gaslightparlour");
        assert_eq!(sample.grease.sum, 50.0);
    }

    #[tokio::test]
    async fn test_run_loop_publishes_and_stops_on_shutdown() {
        let lister = MockLister {
            beacons: vec!["gildedgateway".to_string()],
            pods: HashMap::from([(
                "gildedgateway".to_string(),
                vec!["10.0.0.1".to_string()],
            )]),
            fail_discovery: false,
        };
        let source = MockSource::new(HashMap::from([(
            "10.0.0.1".to_string(),
            gauges(12.0, 3.0),
        )]));

        let (poller, reader) = poller_with(lister, source, EmptyCyclePolicy::Zero);
        let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
        let task = tokio::spawn(poller.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(reader.latest().sample("gildedgateway").grease.sum, 12.0);

        shutdown_tx.send(()).unwrap();
        task.await.unwrap();
    }
}
