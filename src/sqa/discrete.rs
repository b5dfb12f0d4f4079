use crate::errors::{require_positive, QaError, Result};
use crate::model::{make_random_spin_state, spin, IsingModel};
use crate::schedule::AnnealingSchedule;
use crate::sqa::observables::{replica_average, replica_majority};
use crate::sqa::stepper::AnnealStepper;
use crate::util::metropolis::should_flip;
use rand::Rng;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Parameters of a Trotter-replica run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct DiscreteParams {
    /// Number of Trotter replicas `M`.
    pub replicas: usize,
    /// Temperature `T`.
    pub temperature: f64,
    /// Fold the local field into couplings to an extra ancilla spin.
    pub embed_field: bool,
}

impl Default for DiscreteParams {
    fn default() -> Self {
        Self {
            replicas: 40,
            temperature: 0.05,
            embed_field: false,
        }
    }
}

/// Simulated quantum annealing on `M` classical replicas coupled in imaginary time.
///
/// The state holds `M` copies of the `N` spins back to back, replica `r` at `[r*N, (r+1)*N)`.
/// Each replica carries `1/M` of the couplings and fields, and spin `i` of replica `r` is coupled
/// to spin `i` of replicas `r - 1` and `r + 1` (mod `M`) with a strength set by the transverse
/// field.
#[derive(Debug, Clone)]
pub struct DiscreteWorldlineSampler<R: Rng> {
    model: IsingModel,
    // Set when `model` is the ancilla embedding of the input model.
    embedded: bool,
    nreplicas: usize,
    temperature: f64,
    state: Vec<bool>,
    rng: R,
}

impl<R: Rng> DiscreteWorldlineSampler<R> {
    /// Make a sampler, either with a random state or with `initial_state` copied to all replicas.
    pub fn new(
        model: &IsingModel,
        params: DiscreteParams,
        mut rng: R,
        initial_state: Option<&[bool]>,
    ) -> Result<Self> {
        if params.replicas == 0 {
            return Err(QaError::invalid("replicas", 0.0));
        }
        let temperature = require_positive("temperature", params.temperature)?;

        let embedded = params.embed_field && model.has_local_field();
        let model = if embedded {
            model.with_ancilla()?
        } else {
            model.clone()
        };
        let nvars = model.nvars();
        let nreplicas = params.replicas;

        let state = match initial_state {
            Some(initial) => {
                let logical = nvars - usize::from(embedded);
                if initial.len() != logical {
                    return Err(QaError::ShapeMismatch {
                        what: "initial state",
                        expected: logical,
                        found: initial.len(),
                    });
                }
                let mut replica = initial.to_vec();
                if embedded {
                    replica.push(true);
                }
                replica.repeat(nreplicas)
            }
            None => make_random_spin_state(nvars * nreplicas, &mut rng),
        };

        Ok(Self {
            model,
            embedded,
            nreplicas,
            temperature,
            state,
            rng,
        })
    }

    /// Number of logical spins, not counting the ancilla.
    pub fn nvars(&self) -> usize {
        self.model.nvars() - usize::from(self.embedded)
    }

    /// Number of replicas.
    pub fn nreplicas(&self) -> usize {
        self.nreplicas
    }

    /// The raw replica state, including the ancilla spin of each replica if there is one.
    pub fn state_ref(&self) -> &[bool] {
        &self.state
    }

    /// The model the replicas actually sample, after any ancilla embedding.
    pub fn model(&self) -> &IsingModel {
        &self.model
    }

    /// State of the logical spins of every replica, `nvars() * nreplicas()` long.
    pub fn logical_state(&self) -> Vec<bool> {
        if self.embedded {
            self.state
                .chunks_exact(self.model.nvars())
                .flat_map(IsingModel::resolve_ancilla)
                .collect()
        } else {
            self.state.clone()
        }
    }

    /// Logical spins which are +1 in the majority of replicas.
    pub fn majority(&self) -> Vec<bool> {
        replica_majority(&self.logical_state(), self.nvars(), self.nreplicas)
    }

    /// Strength of the ring coupling between neighboring replicas.
    ///
    /// `Jp = -T/2 ln(tanh(gamma / (M T)))`, which diverges as gamma goes to zero.
    pub fn replica_coupling(&self, gamma: f64) -> f64 {
        let m = self.nreplicas as f64;
        -0.5 * self.temperature * (gamma / (m * self.temperature)).tanh().ln()
    }

    /// Energy change from flipping spin `var` of replica `r`.
    fn local_delta(&self, r: usize, var: usize, jp: f64) -> f64 {
        let n = self.model.nvars();
        let m = self.nreplicas;
        let replica = &self.state[r * n..(r + 1) * n];
        let delta_e = self.model.flip_delta(replica, var) / m as f64;
        // A single replica has no neighbors in imaginary time.
        if m == 1 {
            return delta_e;
        }
        let up = self.state[((r + 1) % m) * n + var];
        let down = self.state[((r + m - 1) % m) * n + var];
        delta_e + 2.0 * jp * spin(replica[var]) * (spin(up) + spin(down))
    }

    /// Energy change from flipping `var` in every replica, the ring terms cancel.
    fn global_delta(&self, var: usize) -> f64 {
        let n = self.model.nvars();
        let m = self.nreplicas as f64;
        self.state
            .chunks_exact(n)
            .map(|replica| self.model.flip_delta(replica, var))
            .sum::<f64>()
            / m
    }

    /// Give back the rng.
    pub fn into_rng(self) -> R {
        self.rng
    }
}

impl<R: Rng> AnnealStepper for DiscreteWorldlineSampler<R> {
    fn check_step(&self, step: usize, gamma: f64) -> Result<()> {
        if !(gamma.is_finite() && gamma >= 0.0) {
            return Err(QaError::invalid_at("transverse field", gamma, step));
        }
        if self.nreplicas > 1 {
            let coupling = self.replica_coupling(gamma);
            if !coupling.is_finite() {
                return Err(QaError::NumericalDegeneracy {
                    step,
                    gamma,
                    coupling,
                });
            }
        }
        Ok(())
    }

    fn anneal_step(&mut self, step: usize, gamma: f64) -> Result<()> {
        self.check_step(step, gamma)?;
        let jp = if self.nreplicas > 1 {
            self.replica_coupling(gamma)
        } else {
            0.0
        };
        let n = self.model.nvars();
        if n == 0 {
            return Ok(());
        }
        let beta = 1.0 / self.temperature;

        // Local move
        let flip = self.rng.gen_range(0..n * self.nreplicas);
        let delta_e = self.local_delta(flip / n, flip % n, jp);
        let local = should_flip(&mut self.rng, beta, delta_e);
        if local {
            self.state[flip] = !self.state[flip];
        }

        // Global move
        let var = self.rng.gen_range(0..n);
        let delta_e = self.global_delta(var);
        let global = should_flip(&mut self.rng, beta, delta_e);
        if global {
            self.state
                .iter_mut()
                .skip(var)
                .step_by(n)
                .for_each(|s| *s = !*s);
        }
        trace!(step, gamma, jp, local, global, "discrete sweep");
        Ok(())
    }

    fn pauli_z(&self) -> Vec<f64> {
        replica_average(&self.logical_state(), self.nvars(), self.nreplicas)
    }
}

/// Run simulated quantum annealing over Trotter replicas and return the logical replica state.
///
/// The result has `nvars * replicas` entries, replica `r` at `[r*N, (r+1)*N)`.
pub fn run_discrete<R: Rng>(
    model: &IsingModel,
    schedule: &AnnealingSchedule,
    params: DiscreteParams,
    rng: R,
    initial_state: Option<&[bool]>,
) -> Result<Vec<bool>> {
    let mut sampler = DiscreteWorldlineSampler::new(model, params, rng, initial_state)?;
    debug!(
        nvars = sampler.nvars(),
        replicas = params.replicas,
        temperature = params.temperature,
        steps = schedule.len(),
        "discrete anneal"
    );
    sampler.anneal_measure(schedule, (), |_, _| ())?;
    Ok(sampler.logical_state())
}

#[cfg(test)]
mod discrete_tests {
    use super::*;
    use rand::prelude::SmallRng;
    use rand::SeedableRng;

    fn diag_model() -> IsingModel {
        IsingModel::new(
            &[
                vec![-1.0, 0.0, 0.0, 0.0],
                vec![0.0, 1.0, 0.0, 0.0],
                vec![0.0, 0.0, 1.0, 0.0],
                vec![0.0, 0.0, 0.0, 1.0],
            ],
            None,
        )
        .unwrap()
    }

    fn params(replicas: usize) -> DiscreteParams {
        DiscreteParams {
            replicas,
            temperature: 0.05,
            embed_field: false,
        }
    }

    #[test]
    fn test_single_replica_finds_ground_state() {
        for seed in 0..8 {
            let rng = SmallRng::seed_from_u64(seed);
            let schedule = AnnealingSchedule::new(vec![0.0; 2000]).unwrap();
            let state = run_discrete(&diag_model(), &schedule, params(1), rng, None).unwrap();
            assert_eq!(state, vec![true, false, false, false]);
        }
    }

    #[test]
    fn test_tiles_initial_state() {
        let rng = SmallRng::seed_from_u64(0);
        let initial = [true, false, true, false];
        let sampler =
            DiscreteWorldlineSampler::new(&diag_model(), params(3), rng, Some(&initial)).unwrap();
        assert_eq!(sampler.state_ref(), initial.repeat(3).as_slice());
        assert_eq!(sampler.pauli_z(), vec![1.0, -1.0, 1.0, -1.0]);
        assert_eq!(sampler.majority(), initial.to_vec());
    }

    #[test]
    fn test_empty_schedule_is_noop() {
        let rng = SmallRng::seed_from_u64(0);
        let initial = [false; 4];
        let schedule = AnnealingSchedule::default();
        let state = run_discrete(&diag_model(), &schedule, params(5), rng, Some(&initial)).unwrap();
        assert_eq!(state, vec![false; 20]);
    }

    #[test]
    fn test_shape_mismatch() {
        let rng = SmallRng::seed_from_u64(0);
        let err = DiscreteWorldlineSampler::new(&diag_model(), params(2), rng, Some(&[true]))
            .unwrap_err();
        assert!(matches!(err, QaError::ShapeMismatch { found: 1, .. }));
    }

    #[test]
    fn test_bad_params() {
        let rng = SmallRng::seed_from_u64(0);
        let mut p = params(2);
        p.temperature = 0.0;
        assert!(DiscreteWorldlineSampler::new(&diag_model(), p, rng.clone(), None).is_err());
        assert!(DiscreteWorldlineSampler::new(&diag_model(), params(0), rng, None).is_err());
    }

    #[test]
    fn test_zero_field_is_degenerate() {
        let rng = SmallRng::seed_from_u64(0);
        let initial = [false; 4];
        let mut sampler =
            DiscreteWorldlineSampler::new(&diag_model(), params(4), rng, Some(&initial)).unwrap();
        let schedule = AnnealingSchedule::new(vec![1.0, 0.5, 0.0]).unwrap();
        let err = sampler.anneal(&schedule).unwrap_err();
        assert!(matches!(err, QaError::NumericalDegeneracy { step: 2, .. }));
        // Nothing ran.
        assert_eq!(sampler.state_ref(), &[false; 16]);
    }

    #[test]
    fn test_replica_coupling() {
        let rng = SmallRng::seed_from_u64(0);
        let sampler = DiscreteWorldlineSampler::new(&diag_model(), params(40), rng, None).unwrap();
        let expected = -0.5 * 0.05 * (3.0f64 / 2.0).tanh().ln();
        assert!((sampler.replica_coupling(3.0) - expected).abs() < 1e-12);
        assert!(sampler.replica_coupling(1e-8).is_finite());
        assert!(sampler.replica_coupling(1e-8) > sampler.replica_coupling(3.0));
    }

    #[test]
    fn test_local_delta_ring() {
        let rng = SmallRng::seed_from_u64(0);
        let model = IsingModel::new(&[vec![0.0]], None).unwrap();
        let sampler =
            DiscreteWorldlineSampler::new(&model, params(3), rng, Some(&[true])).unwrap();
        // Both neighbors aligned: flipping costs 2 * Jp * 2.
        assert!((sampler.local_delta(1, 0, 0.5) - 2.0).abs() < 1e-12);
        assert_eq!(sampler.global_delta(0), 0.0);
    }

    #[test]
    fn test_global_move_flips_column() {
        // No couplings and a vanishing ring term: every move is neutral and accepted, so the
        // move choices can be replayed from a copy of the rng.
        let n = 3;
        let m = 4;
        let model = IsingModel::new(&vec![vec![0.0; n]; n], None).unwrap();
        let gamma = 1e3;
        for seed in 0..8 {
            let mut replay = SmallRng::seed_from_u64(seed);
            let rng = SmallRng::seed_from_u64(seed);
            let mut sampler =
                DiscreteWorldlineSampler::new(&model, params(m), rng, Some(&[false; 3])).unwrap();
            assert_eq!(sampler.replica_coupling(gamma), 0.0);

            let mut expected = vec![false; n * m];
            for step in 0..10 {
                let before = expected.clone();
                let flip = replay.gen_range(0..n * m);
                let var = replay.gen_range(0..n);
                expected[flip] = !expected[flip];
                (0..m).for_each(|r| expected[r * n + var] = !expected[r * n + var]);

                sampler.anneal_step(step, gamma).unwrap();
                assert_eq!(sampler.state_ref(), expected.as_slice());

                // A whole column, give or take the single local flip.
                let changed = before
                    .iter()
                    .zip(sampler.state_ref())
                    .filter(|(a, b)| a != b)
                    .count();
                let overlap = flip % n == var;
                assert_eq!(changed, if overlap { m - 1 } else { m + 1 });
            }
        }
    }

    #[test]
    fn test_embedded_field() {
        let model = IsingModel::new(&[vec![0.0, 0.0], vec![0.0, 0.0]], Some(&[1.0, -1.0])).unwrap();
        let p = DiscreteParams {
            replicas: 1,
            temperature: 0.05,
            embed_field: true,
        };
        for seed in 0..4 {
            let rng = SmallRng::seed_from_u64(seed);
            let mut sampler = DiscreteWorldlineSampler::new(&model, p, rng, None).unwrap();
            assert_eq!(sampler.state_ref().len(), 3);
            let schedule = AnnealingSchedule::new(vec![0.0; 2000]).unwrap();
            sampler.anneal(&schedule).unwrap();
            assert_eq!(sampler.majority(), vec![false, true]);
        }
    }
}
