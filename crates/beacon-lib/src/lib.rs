//! Core library for the Genteel Beacon synthetic-load harness
//!
//! This crate provides:
//! - The resource-pressure simulation engine (counters, trip gate, replenisher)
//! - Chaos-chance configuration with an optional remote override source
//! - The gauge exposition-line parser used by the gearsmith scraper
//! - Per-beacon aggregation snapshots for the custom-metrics server
//! - Prometheus observability

pub mod aggregate;
pub mod chaos;
pub mod models;
pub mod observability;
pub mod pressure;
pub mod scrape;

pub use aggregate::{
    BeaconSample, CycleReadings, EmptyCyclePolicy, GaugeSample, Snapshot, SnapshotPublisher,
    SnapshotReader,
};
pub use chaos::{ChanceProvider, ChanceRefresher, ChaosChances};
pub use models::*;
pub use observability::BeaconMetrics;
pub use pressure::{
    CounterKind, Decision, PressureActor, PressureActorConfig, PressureHandle, PressureLevels,
    ReplenishScheduler, TripError,
};
pub use scrape::{parse_gauge_line, scan_gauges, GaugeKind, GaugeValue};
