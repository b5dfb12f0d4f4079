//! Classical heuristics over the same [`IsingModel`](crate::model::IsingModel), plus QUBO
//! entry points for annealing and tempering.
//!
//! Parallel tempering is enabled via the `tempering` and `parallel-tempering` features.

/// Single spin Metropolis annealing through a temperature schedule.
pub mod annealing;
/// Simulated bifurcation with adiabatic, ballistic and discrete dynamics.
pub mod bifurcation;
/// Replica exchange between fixed temperatures.
#[cfg(feature = "tempering")]
pub mod tempering;

pub use annealing::{run_annealing, run_qubo_annealing, SimulatedAnnealer};
pub use bifurcation::{
    pump_schedule, run_bifurcation, BifurcationKind, BifurcationParams, SimulatedBifurcation,
};
#[cfg(feature = "parallel-tempering")]
pub use tempering::rayon_tempering::*;
#[cfg(feature = "tempering")]
pub use tempering::TemperingContainer;
