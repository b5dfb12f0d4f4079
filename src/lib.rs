#![deny(
    missing_docs,
    unreachable_pub,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_import_braces,
    unused_qualifications
)]

//! `qanneal` is a library for simulated quantum annealing of ising models with a transverse
//! field, using path integral monte carlo in imaginary time.
//!
//! The `sqa` module contains two samplers: one over discrete Trotter replicas and one over
//! continuous time worldlines built from [`SegmentTrajectory`](sqa::SegmentTrajectory).
//!
//! It also offers a few feature gated modules:
//! - classical parallel tempering using the `tempering` or `parallel-tempering` feature gates.
//! - classical simulated bifurcation, always available under `classical::bifurcation`.
//! - autocorrelation calculations on recorded observable histories: use `autocorrelations`
//! - model, schedule and output serialization using serde with the `serialize` feature.
//!
//! # Basic Quantum Annealing Example
//! ```
//! use qanneal::model::IsingModel;
//! use qanneal::schedule::AnnealingSchedule;
//! use qanneal::sqa::*;
//! use rand::prelude::*;
//!
//! // E = sum J_ij s_i s_j + sum h_i s_i
//! let edges = vec![
//!   ((0, 1), -1.0), // ((i, j), J)
//!   ((1, 2), 1.0),
//!   ((2, 3), 1.0),
//!   ((3, 0), 1.0)
//! ];
//! let model = IsingModel::from_edges(4, &edges, None).unwrap();
//!
//! // Transverse field decays from 3 to 1e-6 over 1000 sweeps.
//! let schedule = AnnealingSchedule::geometric(3.0, 1e-6, 1000).unwrap();
//!
//! // Trotter replicas, state comes back as nvars * replicas bools.
//! let params = DiscreteParams { replicas: 8, ..Default::default() };
//! let rng = SmallRng::seed_from_u64(1234);
//! let state = run_discrete(&model, &schedule, params, rng, None).unwrap();
//! assert_eq!(state.len(), 4 * 8);
//!
//! // Continuous time worldlines, returns per-spin time averages of pauli-z.
//! let rng = SmallRng::seed_from_u64(1234);
//! let obs = run_continuous(&model, &schedule, ContinuousParams::default(), rng, false).unwrap();
//! assert_eq!(obs.spins().len(), 4);
//! ```

/// Autocorrelations of recorded observable histories.
#[cfg(feature = "autocorrelations")]
pub mod autocorrelations;
/// A limited classical monte carlo library for ising models.
pub mod classical;
/// Errors returned by models, schedules and samplers.
pub mod errors;
/// Ising model couplings and fields.
pub mod model;
/// Transverse field schedules.
pub mod schedule;
/// Simulated quantum annealing samplers and traits.
pub mod sqa;
/// Small helpers shared between samplers.
pub mod util;
