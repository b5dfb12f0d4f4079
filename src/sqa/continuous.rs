use crate::errors::{require_positive, QaError, Result};
use crate::model::{spin, IsingModel};
use crate::schedule::AnnealingSchedule;
use crate::sqa::observables::{time_averages, ObservableCollector, Observables};
use crate::sqa::stepper::AnnealStepper;
use crate::sqa::trajectory::SegmentTrajectory;
use rand::Rng;
use rand_distr::{Distribution, Poisson};
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, trace};

/// Parameters of a continuous imaginary time run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ContinuousParams {
    /// Temperature `T`, the worldlines live on `[0, 1/T)`.
    pub temperature: f64,
}

impl Default for ContinuousParams {
    fn default() -> Self {
        Self { temperature: 0.05 }
    }
}

/// Counts of proposed and accepted segment flips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SweepStats {
    /// Segment flips proposed.
    pub proposed: u64,
    /// Segment flips accepted.
    pub accepted: u64,
}

impl SweepStats {
    /// Fraction of proposals which were accepted, zero before any proposal.
    pub fn acceptance_rate(&self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            self.accepted as f64 / self.proposed as f64
        }
    }
}

/// Simulated quantum annealing with one continuous worldline per spin.
///
/// Every sweep visits the spins in order. Each spin gets a Poisson number of new cuts, then each
/// of its segments is flipped against the current worldlines of its neighbors, and finally its
/// redundant cuts are removed. Spins later in the sweep see the updated earlier ones.
#[derive(Debug, Clone)]
pub struct ContinuousTimeSampler<R: Rng> {
    model: IsingModel,
    beta: f64,
    trajectories: Vec<SegmentTrajectory>,
    stats: SweepStats,
    // An alloc to reuse for new cut positions.
    kink_buffer: SmallVec<[f64; 16]>,
    rng: R,
}

impl<R: Rng> ContinuousTimeSampler<R> {
    /// Make a sampler with random worldlines holding Poisson(`initial_gamma * beta`) cuts each.
    pub fn new(
        model: &IsingModel,
        params: ContinuousParams,
        mut rng: R,
        initial_gamma: f64,
    ) -> Result<Self> {
        let temperature = require_positive("temperature", params.temperature)?;
        let beta = 1.0 / temperature;
        let kinks = kink_distribution(initial_gamma * beta, None)?;
        let trajectories = (0..model.nvars())
            .map(|_| {
                let count = sample_count(kinks.as_ref(), &mut rng);
                SegmentTrajectory::random(beta, count, &mut rng)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            model: model.clone(),
            beta,
            trajectories,
            stats: SweepStats::default(),
            kink_buffer: SmallVec::new(),
            rng,
        })
    }

    /// Make a sampler from existing worldlines, one per spin, all on the same circle.
    pub fn new_with_trajectories(
        model: &IsingModel,
        trajectories: Vec<SegmentTrajectory>,
        rng: R,
    ) -> Result<Self> {
        if trajectories.len() != model.nvars() {
            return Err(QaError::ShapeMismatch {
                what: "trajectories",
                expected: model.nvars(),
                found: trajectories.len(),
            });
        }
        let beta = trajectories.first().map(|t| t.beta()).unwrap_or(1.0);
        require_positive("beta", beta)?;
        if let Some(t) = trajectories.iter().find(|t| t.beta() != beta) {
            return Err(QaError::invalid("beta", t.beta()));
        }
        Ok(Self {
            model: model.clone(),
            beta,
            trajectories,
            stats: SweepStats::default(),
            kink_buffer: SmallVec::new(),
            rng,
        })
    }

    /// Length of the imaginary time circle, `1/T`.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Number of spins.
    pub fn nvars(&self) -> usize {
        self.trajectories.len()
    }

    /// The worldline of every spin.
    pub fn trajectories(&self) -> &[SegmentTrajectory] {
        &self.trajectories
    }

    /// Segment flip counts since construction.
    pub fn stats(&self) -> SweepStats {
        self.stats
    }

    /// Give back the rng.
    pub fn into_rng(self) -> R {
        self.rng
    }

    /// Add a Poisson number of redundant cuts to `var`.
    fn insert_new_kinks(&mut self, var: usize, kinks: Option<&Poisson<f64>>) -> Result<()> {
        let count = sample_count(kinks, &mut self.rng);
        let beta = self.beta;
        let rng = &mut self.rng;
        self.kink_buffer.clear();
        self.kink_buffer
            .extend((0..count).map(|_| rng.gen_range(0.0..beta)));
        self.kink_buffer.sort_unstable_by(f64::total_cmp);
        self.trajectories[var].insert_kinks(self.kink_buffer.iter().copied())
    }

    /// Energy change from flipping segment `seg` of `var`.
    fn segment_delta(&self, var: usize, seg: usize) -> f64 {
        let traj = &self.trajectories[var];
        let (start, end, value) = traj.segment(seg);
        let coupling: f64 = self
            .model
            .neighbors(var)
            .iter()
            .map(|(k, j)| j * self.trajectories[*k].integrate(start, end))
            .sum();
        let field = self.model.fields()[var] * traj.segment_duration(seg);
        -2.0 * spin(value) * (coupling + field)
    }

    /// Propose a flip of every segment of `var`.
    fn update_segments(&mut self, var: usize) {
        for seg in 0..self.trajectories[var].segment_count() {
            let delta_e = self.segment_delta(var, seg);
            // Half the metropolis probability.
            let chance = (-delta_e).exp().min(1.0) / 2.0;
            self.stats.proposed += 1;
            if self.rng.gen::<f64>() < chance {
                self.trajectories[var].flip_segment(seg);
                self.stats.accepted += 1;
            }
        }
    }
}

/// Poisson distribution of cut counts for `rate`, or `None` if no cuts should be made.
fn kink_distribution(rate: f64, step: Option<usize>) -> Result<Option<Poisson<f64>>> {
    let err = || QaError::InvalidParameter {
        name: "kink rate",
        value: rate,
        step,
    };
    if !(rate.is_finite() && rate >= 0.0) {
        Err(err())
    } else if rate == 0.0 {
        Ok(None)
    } else {
        Poisson::new(rate).map(Some).map_err(|_| err())
    }
}

fn sample_count<R: Rng>(kinks: Option<&Poisson<f64>>, rng: &mut R) -> usize {
    kinks
        .map(|p| {
            let count: f64 = p.sample(rng);
            count as usize
        })
        .unwrap_or(0)
}

impl<R: Rng> AnnealStepper for ContinuousTimeSampler<R> {
    fn check_step(&self, step: usize, gamma: f64) -> Result<()> {
        if !(gamma.is_finite() && gamma >= 0.0) {
            return Err(QaError::invalid_at("transverse field", gamma, step));
        }
        kink_distribution(gamma * self.beta, Some(step)).map(|_| ())
    }

    fn anneal_step(&mut self, step: usize, gamma: f64) -> Result<()> {
        self.check_step(step, gamma)?;
        let kinks = kink_distribution(gamma * self.beta, Some(step))?;
        for var in 0..self.trajectories.len() {
            self.insert_new_kinks(var, kinks.as_ref())?;
            self.update_segments(var);
            self.trajectories[var].cleanup();
        }
        trace!(
            step,
            gamma,
            accepted = self.stats.accepted,
            proposed = self.stats.proposed,
            "continuous sweep"
        );
        Ok(())
    }

    fn pauli_z(&self) -> Vec<f64> {
        time_averages(&self.trajectories)
    }
}

/// Run continuous imaginary time annealing and return the per-spin time averages.
///
/// The worldlines start with cuts drawn at the first field of the schedule. With
/// `record_history` the time averages after every step are kept as well.
pub fn run_continuous<R: Rng>(
    model: &IsingModel,
    schedule: &AnnealingSchedule,
    params: ContinuousParams,
    rng: R,
    record_history: bool,
) -> Result<Observables> {
    let initial_gamma = schedule.first().unwrap_or(0.0);
    let mut sampler = ContinuousTimeSampler::new(model, params, rng, initial_gamma)?;
    debug!(
        nvars = sampler.nvars(),
        beta = sampler.beta(),
        steps = schedule.len(),
        "continuous anneal"
    );
    let observables = if record_history {
        sampler.anneal_sample(schedule)?
    } else {
        let values = sampler.anneal(schedule)?;
        ObservableCollector::new(false).finish(values)
    };
    let stats = sampler.stats();
    debug!(
        accepted = stats.accepted,
        proposed = stats.proposed,
        rate = stats.acceptance_rate(),
        "continuous anneal done"
    );
    Ok(observables)
}
