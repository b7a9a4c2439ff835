//! Probabilistic trip gate
//!
//! Converts a counter value into a pass/trip outcome. Failure probability
//! ramps linearly from 0 at the threshold to 1 at threshold + ramp width:
//! guaranteed pass at or below 90, guaranteed trip at or above 100.

use super::{CounterKind, PressureHandle};
use rand::Rng;
use std::time::Duration;
use tracing::debug;

/// Counter value at which the gate starts tripping
const TRIP_THRESHOLD: i64 = 90;
/// Width of the linear probability ramp above the threshold
const RAMP_WIDTH: i64 = 10;
/// Artificial latency introduced on a pass, for realistic timing traces
const PASS_DELAY: Duration = Duration::from_millis(3);

/// Outcome of a gate decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Pass,
    Trip,
}

/// Resource-exhausted errors surfaced when a gate trips
#[derive(Debug, Clone, thiserror::Error)]
pub enum TripError {
    #[error("Grease Grate clogged 💀")]
    GreaseGrate,
    #[error("Ink Well running dry 🐙")]
    InkWell,
}

impl TripError {
    pub fn for_counter(kind: CounterKind) -> Self {
        match kind {
            CounterKind::Grease => TripError::GreaseGrate,
            CounterKind::Ink => TripError::InkWell,
        }
    }
}

/// Failure probability for a counter value, clamped to [0, 1]
pub fn trip_probability(value: i64) -> f64 {
    ((value - TRIP_THRESHOLD) as f64 / RAMP_WIDTH as f64).clamp(0.0, 1.0)
}

/// Decision given one uniform sample from [0, 1); deterministic
pub fn decide_with(value: i64, sample: f64) -> Decision {
    if sample < trip_probability(value) {
        Decision::Trip
    } else {
        Decision::Pass
    }
}

/// Draw a fresh sample and decide
pub fn decide(value: i64) -> Decision {
    decide_with(value, rand::thread_rng().gen::<f64>())
}

/// Gate a request on the current value of one counter
///
/// On trip returns the counter's resource-exhausted error; the caller must
/// not apply a `+1` for this cycle. On pass sleeps the artificial latency
/// before returning.
pub async fn guard(handle: &PressureHandle, kind: CounterKind) -> Result<(), TripError> {
    let value = handle.read(kind);
    let probability = trip_probability(value);

    debug!(
        counter = kind.as_str(),
        value, probability, "Checking trip gate"
    );

    match decide(value) {
        Decision::Trip => Err(TripError::for_counter(kind)),
        Decision::Pass => {
            tokio::time::sleep(PASS_DELAY).await;
            Ok(())
        }
    }
}
