//! Simulated quantum annealing of the transverse field Ising model.
//!
//! Two representations of the imaginary time path integral are provided:
//! - [`DiscreteWorldlineSampler`] keeps `M` Trotter replicas coupled in a ring.
//! - [`ContinuousTimeSampler`] keeps one [`SegmentTrajectory`] per spin on `[0, beta)`.
//!
//! Both implement [`AnnealStepper`], which runs a schedule one sweep per field strength.

pub use continuous::{run_continuous, ContinuousParams, ContinuousTimeSampler, SweepStats};
pub use discrete::{run_discrete, DiscreteParams, DiscreteWorldlineSampler};
pub use observables::*;
pub use stepper::AnnealStepper;
pub use trajectory::SegmentTrajectory;

/// Continuous imaginary time sampler.
pub mod continuous;
/// Trotter replica sampler.
pub mod discrete;
/// Reductions of sampler state to expectation values.
pub mod observables;
/// Stepping through annealing schedules.
pub mod stepper;
/// Piecewise constant worldlines.
pub mod trajectory;
