//! Observability infrastructure for the beacon
//!
//! Provides the prometheus gauges scraped by peer gearsmith instances plus
//! trip counters for the two gates. The gauge names are part of the external
//! contract: the scraper matches on their exposition-line prefixes.

use prometheus::{register_int_counter_vec, register_int_gauge, IntCounterVec, IntGauge};
use std::sync::OnceLock;

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<BeaconMetricsInner> = OnceLock::new();

struct BeaconMetricsInner {
    grease_buildup: IntGauge,
    ink_depletion: IntGauge,
    gate_trips: IntCounterVec,
}

impl BeaconMetricsInner {
    fn new() -> Self {
        Self {
            grease_buildup: register_int_gauge!(
                "genteelbeacon_greasebuildup_p",
                "The Genteel Beacon's current grease buildup"
            )
            .expect("Failed to register greasebuildup gauge"),

            ink_depletion: register_int_gauge!(
                "genteelbeacon_inkdepletion_p",
                "The Genteel Beacon's current ink depletion"
            )
            .expect("Failed to register inkdepletion gauge"),

            gate_trips: register_int_counter_vec!(
                "genteelbeacon_gate_trips_total",
                "Requests rejected by a trip gate",
                &["gate"]
            )
            .expect("Failed to register gate_trips counter"),
        }
    }
}

/// Beacon metrics for prometheus exposition
///
/// Lightweight handle to the global instance; clones share the same metrics.
#[derive(Clone)]
pub struct BeaconMetrics {
    _private: (),
}

impl Default for BeaconMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl BeaconMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(BeaconMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &BeaconMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Keep the grease gauge in lockstep with the actor's counter
    pub fn set_grease_buildup(&self, value: i64) {
        self.inner().grease_buildup.set(value);
    }

    /// Keep the ink gauge in lockstep with the actor's counter
    pub fn set_ink_depletion(&self, value: i64) {
        self.inner().ink_depletion.set(value);
    }

    /// Count a rejected request per gate name
    pub fn inc_gate_trips(&self, gate: &str) {
        self.inner().gate_trips.with_label_values(&[gate]).inc();
    }
}
