use crate::errors::{QaError, Result};
use crate::model::{make_random_spin_state, IsingModel, QuboModel};
use crate::util::metropolis::should_flip;
use rand::Rng;
use std::fmt::{Debug, Error, Formatter};
use tracing::debug;

/// Classical single spin Metropolis annealing of an Ising model.
///
/// A QUBO problem is annealed through its Ising form, see [`SimulatedAnnealer::from_qubo`].
pub struct SimulatedAnnealer<R: Rng> {
    model: IsingModel,
    state: Vec<bool>,
    // Includes `offset`.
    energy: f64,
    // Constant added to the Ising energy, nonzero for QUBO problems.
    offset: f64,
    rng: R,
}

impl<R: Rng> Debug for SimulatedAnnealer<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::result::Result<(), Error> {
        let s = self
            .state
            .iter()
            .map(|b| if *b { "1" } else { "0" })
            .collect::<Vec<_>>()
            .join("");
        f.write_str(&format!("{}\t{}", s, self.energy))
    }
}

impl<R: Rng> SimulatedAnnealer<R> {
    /// Make an annealer from a random state, or from `initial_state` if given.
    pub fn new(model: &IsingModel, rng: R, initial_state: Option<Vec<bool>>) -> Result<Self> {
        Self::new_with_offset(model, 0.0, rng, initial_state)
    }

    /// Make an annealer minimizing `x^T Q x`, bits map to spins with `true` as 1.
    ///
    /// Energies reported by [`SimulatedAnnealer::get_energy`] are QUBO energies.
    pub fn from_qubo(qubo: &QuboModel, rng: R, initial_state: Option<Vec<bool>>) -> Result<Self> {
        let (model, offset) = qubo.to_ising()?;
        Self::new_with_offset(&model, offset, rng, initial_state)
    }

    pub(crate) fn new_with_offset(
        model: &IsingModel,
        offset: f64,
        mut rng: R,
        initial_state: Option<Vec<bool>>,
    ) -> Result<Self> {
        let state = match initial_state {
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
        let energy = model.energy(&state)? + offset;
        Ok(Self {
            model: model.clone(),
            state,
            energy,
            offset,
            rng,
        })
    }

    /// Perform a random single spin flip at `temperature`, returns whether it was accepted.
    pub fn do_spin_flip(&mut self, temperature: f64) -> bool {
        if self.state.is_empty() {
            return false;
        }
        let var = self.rng.gen_range(0..self.state.len());
        let delta_e = self.model.flip_delta(&self.state, var);
        if should_flip(&mut self.rng, 1.0 / temperature, delta_e) {
            self.state[var] = !self.state[var];
            self.energy += delta_e;
            true
        } else {
            false
        }
    }

    /// One move per temperature, in order.
    ///
    /// Every temperature is checked before the first move.
    pub fn anneal(&mut self, temperatures: &[f64]) -> Result<&[bool]> {
        check_temperatures(temperatures)?;
        let accepted = temperatures
            .iter()
            .filter(|t| self.do_spin_flip(**t))
            .count();
        debug!(
            steps = temperatures.len(),
            accepted,
            energy = self.energy,
            "classical anneal"
        );
        Ok(&self.state)
    }

    /// Get a ref of the spin state.
    pub fn state_ref(&self) -> &[bool] {
        &self.state
    }

    /// Get the spin state.
    pub fn into_state(self) -> Vec<bool> {
        self.state
    }

    /// Overwrite the spin state.
    pub fn set_state(&mut self, state: Vec<bool>) -> Result<()> {
        self.energy = self.model.energy(&state)? + self.offset;
        self.state = state;
        Ok(())
    }

    /// Energy of the current state, tracked through accepted moves.
    pub fn get_energy(&self) -> f64 {
        self.energy
    }
}

pub(crate) fn check_temperatures(temperatures: &[f64]) -> Result<()> {
    match temperatures
        .iter()
        .copied()
        .enumerate()
        .find(|(_, t)| !(t.is_finite() && *t > 0.0))
    {
        Some((step, t)) => Err(QaError::invalid_at("temperature", t, step)),
        None => Ok(()),
    }
}

/// Anneal a model through a temperature schedule and return the final state.
pub fn run_annealing<R: Rng>(
    model: &IsingModel,
    temperatures: &[f64],
    rng: R,
    initial_state: Option<Vec<bool>>,
) -> Result<Vec<bool>> {
    let mut annealer = SimulatedAnnealer::new(model, rng, initial_state)?;
    annealer.anneal(temperatures)?;
    Ok(annealer.into_state())
}

/// Anneal a QUBO problem through a temperature schedule and return the final bits.
pub fn run_qubo_annealing<R: Rng>(
    qubo: &QuboModel,
    temperatures: &[f64],
    rng: R,
    initial_state: Option<Vec<bool>>,
) -> Result<Vec<bool>> {
    let mut annealer = SimulatedAnnealer::from_qubo(qubo, rng, initial_state)?;
    annealer.anneal(temperatures)?;
    Ok(annealer.into_state())
}
