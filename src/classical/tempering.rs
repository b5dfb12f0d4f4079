use crate::classical::annealing::{check_temperatures, SimulatedAnnealer};
use crate::errors::{QaError, Result};
use crate::model::{make_random_spin_state, IsingModel, QuboModel};
use itertools::Itertools;
use rand::Rng;
use tracing::{debug, trace};

/// Replicas of a classical Ising model held at fixed temperatures, with state exchanges between
/// neighboring temperatures.
#[derive(Debug)]
pub struct TemperingContainer<R1: Rng, R2: Rng> {
    model: IsingModel,
    // Constant added to every replica energy, nonzero for QUBO problems.
    offset: f64,
    initial_state: Vec<bool>,
    // Replica and its temperature.
    replicas: Vec<(SimulatedAnnealer<R2>, f64)>,
    rng: R1,
    swaps: usize,
}

impl<R1: Rng, R2: Rng> TemperingContainer<R1, R2> {
    /// Make an empty container, new replicas start from `initial_state` or a random state.
    pub fn new(model: &IsingModel, rng: R1, initial_state: Option<Vec<bool>>) -> Result<Self> {
        Self::new_with_offset(model, 0.0, rng, initial_state)
    }

    /// Make an empty container minimizing `x^T Q x`, replica energies are QUBO energies.
    pub fn from_qubo(qubo: &QuboModel, rng: R1, initial_state: Option<Vec<bool>>) -> Result<Self> {
        let (model, offset) = qubo.to_ising()?;
        Self::new_with_offset(&model, offset, rng, initial_state)
    }

    fn new_with_offset(
        model: &IsingModel,
        offset: f64,
        mut rng: R1,
        initial_state: Option<Vec<bool>>,
    ) -> Result<Self> {
        let initial_state = match initial_state {
            Some(state) if state.len() != model.nvars() => {
                return Err(QaError::ShapeMismatch {
                    what: "initial state",
                    expected: model.nvars(),
                    found: state.len(),
                })
            }
            Some(state) => state,
            None => make_random_spin_state(model.nvars(), &mut rng),
        };
        Ok(Self {
            model: model.clone(),
            offset,
            initial_state,
            replicas: vec![],
            rng,
            swaps: 0,
        })
    }

    /// Add a replica at `temperature` with its own rng.
    ///
    /// Replicas should be added in order of temperature, exchanges only happen between
    /// neighbors.
    pub fn add_replica(&mut self, rng: R2, temperature: f64) -> Result<()> {
        check_temperatures(&[temperature]).map_err(|_| QaError::invalid("temperature", temperature))?;
        let replica =
            SimulatedAnnealer::new_with_offset(
                &self.model,
                self.offset,
                rng,
                Some(self.initial_state.clone()),
            )?;
        self.replicas.push((replica, temperature));
        Ok(())
    }

    /// Number of replicas.
    pub fn num_replicas(&self) -> usize {
        self.replicas.len()
    }

    /// Replicas and their temperatures.
    pub fn replica_ref(&self) -> &[(SimulatedAnnealer<R2>, f64)] {
        &self.replicas
    }

    /// Number of accepted exchanges so far.
    pub fn num_swaps(&self) -> usize {
        self.swaps
    }

    /// Take `t` single spin moves on every replica.
    pub fn timesteps(&mut self, t: usize) {
        self.replicas.iter_mut().for_each(|(r, temperature)| {
            (0..t).for_each(|_| {
                r.do_spin_flip(*temperature);
            })
        })
    }

    /// Attempt an exchange between a random pair of neighboring temperatures.
    pub fn tempering_step(&mut self) {
        if self.replicas.len() <= 1 {
            return;
        }
        let s = self.rng.gen_range(0..self.replicas.len() - 1);
        let p = self.rng.gen_range(0.0..1.0);
        let (lower, upper) = self.replicas.split_at_mut(s + 1);
        let (ra, ta) = &mut lower[s];
        let (rb, tb) = &mut upper[0];
        if swap_chance(ra.get_energy(), *ta, rb.get_energy(), *tb) > p {
            // Temperatures stay in place, the configurations move.
            std::mem::swap(ra, rb);
            self.swaps += 1;
            trace!(pair = s, "replica exchange");
        }
    }

    /// Run `iterations` moves per replica with an exchange attempt every `exchange_interval`,
    /// then return the lowest energy state.
    pub fn run(&mut self, iterations: usize, exchange_interval: usize) -> Result<Vec<bool>> {
        if exchange_interval == 0 {
            return Err(QaError::invalid("exchange interval", 0.0));
        }
        for i in 0..iterations {
            self.timesteps(1);
            if (i + 1) % exchange_interval == 0 {
                self.tempering_step();
            }
        }
        debug!(iterations, swaps = self.swaps, "parallel tempering");
        self.lowest_energy_state()
    }

    /// State of the replica with the lowest energy.
    pub fn lowest_energy_state(&self) -> Result<Vec<bool>> {
        self.replicas
            .iter()
            .position_min_by(|(a, _), (b, _)| a.get_energy().total_cmp(&b.get_energy()))
            .map(|i| self.replicas[i].0.state_ref().to_vec())
            .ok_or(QaError::ShapeMismatch {
                what: "replicas",
                expected: 1,
                found: 0,
            })
    }

    /// Apply `f` to every replica state.
    pub fn iter_over_states<F>(&self, f: F)
    where
        F: Fn(&[bool]),
    {
        self.replicas.iter().for_each(|(r, _)| f(r.state_ref()))
    }
}

/// Metropolis chance of exchanging configurations between temperatures `ta` and `tb`.
fn swap_chance(ea: f64, ta: f64, eb: f64, tb: f64) -> f64 {
    ((ea - eb) * (1.0 / ta - 1.0 / tb)).exp().min(1.0)
}

/// Rayon-parallel replica sweeps. Exchanges still draw from the container rng in order.
#[cfg(feature = "parallel-tempering")]
pub mod rayon_tempering {
    use super::*;
    use rayon::prelude::*;

    /// Parallel sweeps over the replicas of a container.
    pub trait ParallelTemperingSteps {
        /// Take `t` moves on every replica in parallel.
        fn parallel_timesteps(&mut self, t: usize);
        /// Like `run` but with the replica sweeps in parallel.
        fn parallel_run(&mut self, iterations: usize, exchange_interval: usize)
            -> Result<Vec<bool>>;
    }

    impl<R1: Rng, R2: Rng + Send + Sync> ParallelTemperingSteps for TemperingContainer<R1, R2> {
        fn parallel_timesteps(&mut self, t: usize) {
            self.replicas.par_iter_mut().for_each(|(r, temperature)| {
                (0..t).for_each(|_| {
                    r.do_spin_flip(*temperature);
                })
            });
        }

        fn parallel_run(
            &mut self,
            iterations: usize,
            exchange_interval: usize,
        ) -> Result<Vec<bool>> {
            if exchange_interval == 0 {
                return Err(QaError::invalid("exchange interval", 0.0));
            }
            let mut remaining = iterations;
            while remaining > 0 {
                let t = remaining.min(exchange_interval);
                self.parallel_timesteps(t);
                remaining -= t;
                if t == exchange_interval {
                    self.tempering_step();
                }
            }
            self.lowest_energy_state()
        }
    }
}
