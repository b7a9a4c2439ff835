//! Resource-pressure simulation engine
//!
//! Models two imaginary office resources (grease buildup and ink depletion)
//! as non-negative counters owned by a single serialized actor task, with a
//! probabilistic trip gate that converts pressure into request failures and a
//! periodic replenisher that settles both counters.

mod actor;
mod gate;
mod replenish;


pub use actor::{
    CounterKind, Delta, PressureActor, PressureActorConfig, PressureHandle, PressureLevels,
};
pub use gate::{decide, decide_with, guard, trip_probability, Decision, TripError};
pub use replenish::ReplenishScheduler;
