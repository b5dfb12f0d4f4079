use crate::errors::{QaError, Result};
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// An edge between two variables.
pub type Edge = (usize, usize);

/// Converts a boolean spin into its ±1 value.
#[inline]
pub fn spin(b: bool) -> f64 {
    if b {
        1.0
    } else {
        -1.0
    }
}

/// An Ising problem `E(s) = sum_ij J_ij s_i s_j + sum_i h_i s_i` over spins `s_i = ±1`.
///
/// The coupling matrix is symmetrized on construction and its diagonal is moved into the
/// local field, so `J_ii` acts as a field on spin `i` and the stored matrix has a zero diagonal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct IsingModel {
    nvars: usize,
    // Row major, symmetric, zero diagonal.
    couplings: Vec<f64>,
    fields: Vec<f64>,
    // For each var the nonzero couplings, sorted by neighbor.
    binding_mat: Vec<Vec<(usize, f64)>>,
}

impl IsingModel {
    /// Make a model from rows of the coupling matrix and an optional local field.
    pub fn new(j: &[Vec<f64>], h: Option<&[f64]>) -> Result<Self> {
        let nvars = j.len();
        let mut couplings = Vec::with_capacity(nvars * nvars);
        for row in j {
            if row.len() != nvars {
                return Err(QaError::ShapeMismatch {
                    what: "coupling row",
                    expected: nvars,
                    found: row.len(),
                });
            }
            couplings.extend_from_slice(row);
        }
        Self::from_dense(nvars, couplings, h)
    }

    /// Make a model from a list of edges `[((vara, varb), j), ...]` and an optional field.
    ///
    /// Repeated edges accumulate. Each edge contributes `j s_a s_b` to the energy.
    pub fn from_edges(nvars: usize, edges: &[(Edge, f64)], h: Option<&[f64]>) -> Result<Self> {
        let mut couplings = vec![0.0; nvars * nvars];
        for ((a, b), j) in edges.iter().copied() {
            let largest = a.max(b);
            if largest >= nvars {
                return Err(QaError::ShapeMismatch {
                    what: "edge endpoint",
                    expected: nvars,
                    found: largest + 1,
                });
            }
            couplings[a * nvars + b] += j;
        }
        Self::from_dense(nvars, couplings, h)
    }

    fn from_dense(nvars: usize, mut couplings: Vec<f64>, h: Option<&[f64]>) -> Result<Self> {
        let mut fields = match h {
            Some(h) if h.len() != nvars => {
                return Err(QaError::ShapeMismatch {
                    what: "local field",
                    expected: nvars,
                    found: h.len(),
                })
            }
            Some(h) => h.to_vec(),
            None => vec![0.0; nvars],
        };
        if let Some(bad) = couplings
            .iter()
            .chain(fields.iter())
            .copied()
            .find(|v| !v.is_finite())
        {
            return Err(QaError::invalid("coupling", bad));
        }

        for i in 0..nvars {
            fields[i] += couplings[i * nvars + i];
            couplings[i * nvars + i] = 0.0;
            for k in (i + 1)..nvars {
                let sym = 0.5 * (couplings[i * nvars + k] + couplings[k * nvars + i]);
                couplings[i * nvars + k] = sym;
                couplings[k * nvars + i] = sym;
            }
        }

        let binding_mat = (0..nvars)
            .map(|i| {
                (0..nvars)
                    .map(|k| (k, couplings[i * nvars + k]))
                    .filter(|(_, j)| *j != 0.0)
                    .collect::<Vec<_>>()
            })
            .collect();

        Ok(Self {
            nvars,
            couplings,
            fields,
            binding_mat,
        })
    }

    /// Number of spins.
    pub fn nvars(&self) -> usize {
        self.nvars
    }

    /// The symmetrized coupling between `i` and `k`.
    pub fn coupling(&self, i: usize, k: usize) -> f64 {
        self.couplings[i * self.nvars + k]
    }

    /// Local fields, including whatever was on the diagonal of the couplings.
    pub fn fields(&self) -> &[f64] {
        &self.fields
    }

    /// Nonzero couplings of `var` as `(neighbor, J)` pairs.
    pub fn neighbors(&self, var: usize) -> &[(usize, f64)] {
        &self.binding_mat[var]
    }

    /// Whether any local field is nonzero.
    pub fn has_local_field(&self) -> bool {
        self.fields.iter().any(|h| *h != 0.0)
    }

    /// Energy of a state (true is +1).
    pub fn energy(&self, state: &[bool]) -> Result<f64> {
        check_state_len(state, self.nvars)?;
        Ok(state.iter().enumerate().fold(0.0, |acc, (i, si)| {
            let si = spin(*si);
            let coupling_e: f64 = self.binding_mat[i]
                .iter()
                .map(|(k, j)| j * si * spin(state[*k]))
                .sum();
            acc + coupling_e + self.fields[i] * si
        }))
    }

    /// Energy change from flipping `var`: new - old.
    pub fn flip_delta(&self, state: &[bool], var: usize) -> f64 {
        let curr = spin(state[var]);
        let local: f64 = self.binding_mat[var]
            .iter()
            .map(|(k, j)| j * spin(state[*k]))
            .sum();
        // Both J_ik and J_ki terms flip sign.
        -4.0 * curr * local - 2.0 * self.fields[var] * curr
    }

    /// Embed the local field into couplings to an extra spin.
    ///
    /// The returned model has `nvars + 1` spins and no field. Spin `nvars` is the ancilla:
    /// `J[i][a] = J[a][i] = h_i / 2`, so states of the embedded model map back through
    /// [`IsingModel::resolve_ancilla`] with the same energy.
    pub fn with_ancilla(&self) -> Result<Self> {
        let n = self.nvars;
        let m = n + 1;
        let mut couplings = vec![0.0; m * m];
        for i in 0..n {
            couplings[i * m..i * m + n].copy_from_slice(&self.couplings[i * n..(i + 1) * n]);
            couplings[i * m + n] = 0.5 * self.fields[i];
            couplings[n * m + i] = 0.5 * self.fields[i];
        }
        Self::from_dense(m, couplings, None)
    }

    /// Map a state of the ancilla-embedded model back to the logical spins.
    pub fn resolve_ancilla(state: &[bool]) -> Vec<bool> {
        match state.split_last() {
            Some((ancilla, logical)) => logical.iter().map(|s| !(s ^ ancilla)).collect(),
            None => vec![],
        }
    }
}

fn check_state_len(state: &[bool], nvars: usize) -> Result<()> {
    if state.len() == nvars {
        Ok(())
    } else {
        Err(QaError::ShapeMismatch {
            what: "state",
            expected: nvars,
            found: state.len(),
        })
    }
}

/// A QUBO problem `E(x) = x^T Q x` over bits `x_i` in `{0, 1}`.
///
/// `Q` is symmetrized on construction. Since `x_i^2 = x_i` the diagonal acts as a linear
/// term. The classical heuristics solve it through [`QuboModel::to_ising`], where bit `1`
/// is spin `+1`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct QuboModel {
    nvars: usize,
    // Row major, symmetric.
    q: Vec<f64>,
}

impl QuboModel {
    /// Make a problem from the rows of `Q`.
    pub fn new(q: &[Vec<f64>]) -> Result<Self> {
        let nvars = q.len();
        let mut dense = Vec::with_capacity(nvars * nvars);
        for row in q {
            if row.len() != nvars {
                return Err(QaError::ShapeMismatch {
                    what: "qubo row",
                    expected: nvars,
                    found: row.len(),
                });
            }
            dense.extend_from_slice(row);
        }
        if let Some(bad) = dense.iter().copied().find(|v| !v.is_finite()) {
            return Err(QaError::invalid("qubo entry", bad));
        }
        for i in 0..nvars {
            for k in (i + 1)..nvars {
                let sym = 0.5 * (dense[i * nvars + k] + dense[k * nvars + i]);
                dense[i * nvars + k] = sym;
                dense[k * nvars + i] = sym;
            }
        }
        Ok(Self { nvars, q: dense })
    }

    /// Number of bits.
    pub fn nvars(&self) -> usize {
        self.nvars
    }

    /// `x^T Q x` for a bit assignment.
    pub fn energy(&self, state: &[bool]) -> Result<f64> {
        check_state_len(state, self.nvars)?;
        let ones = state
            .iter()
            .enumerate()
            .filter(|(_, x)| **x)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        Ok(ones
            .iter()
            .flat_map(|i| ones.iter().map(move |k| (*i, *k)))
            .map(|(i, k)| self.q[i * self.nvars + k])
            .sum())
    }

    /// Change of `x^T Q x` from flipping bit `var`.
    pub fn flip_delta(&self, state: &[bool], var: usize) -> f64 {
        let row = &self.q[var * self.nvars..(var + 1) * self.nvars];
        let on: f64 = row
            .iter()
            .zip(state.iter())
            .filter(|(_, x)| **x)
            .map(|(q, _)| q)
            .sum();
        let sign = if state[var] { -1.0 } else { 1.0 };
        2.0 * sign * on + row[var]
    }

    /// The equivalent Ising model and the constant `c` with `x^T Q x = E_ising(s) + c`
    /// under `s_i = 2 x_i - 1`.
    pub fn to_ising(&self) -> Result<(IsingModel, f64)> {
        let n = self.nvars;
        let mut couplings = vec![0.0; n * n];
        let mut fields = vec![0.0; n];
        let mut offset = 0.0;
        for i in 0..n {
            for k in 0..n {
                let q = self.q[i * n + k];
                fields[i] += 0.5 * q;
                offset += 0.25 * q;
                if i == k {
                    offset += 0.25 * q;
                } else {
                    couplings[i * n + k] = 0.25 * q;
                }
            }
        }
        let model = IsingModel::from_dense(n, couplings, Some(&fields))?;
        Ok((model, offset))
    }
}

/// Randomly build a spin state.
pub fn make_random_spin_state<R: rand::Rng>(n: usize, rng: &mut R) -> Vec<bool> {
    (0..n).map(|_| -> bool { rng.gen() }).collect()
}

#[cfg(test)]
mod model_tests {
    use super::*;
    use rand::prelude::SmallRng;
    use rand::SeedableRng;

    fn simple_model() -> IsingModel {
        IsingModel::new(
            &[
                vec![-1.0, 2.0, 0.0],
                vec![0.0, 1.0, -1.0],
                vec![0.0, 0.5, 0.0],
            ],
            Some(&[0.0, 0.0, 0.25]),
        )
        .unwrap()
    }

    #[test]
    fn test_symmetrize_and_fold_diagonal() {
        let model = simple_model();
        assert_eq!(model.coupling(0, 1), 1.0);
        assert_eq!(model.coupling(1, 0), 1.0);
        assert_eq!(model.coupling(1, 2), -0.25);
        assert_eq!(model.coupling(0, 0), 0.0);
        assert_eq!(model.fields(), &[-1.0, 1.0, 0.25]);
        assert_eq!(model.neighbors(0), &[(1, 1.0)]);
        assert_eq!(model.neighbors(1), &[(0, 1.0), (2, -0.25)]);
    }

    #[test]
    fn test_shape_mismatch() {
        let err = IsingModel::new(&[vec![0.0, 1.0], vec![1.0]], None).unwrap_err();
        assert!(matches!(err, QaError::ShapeMismatch { .. }));
        let err = IsingModel::new(&[vec![0.0]], Some(&[1.0, 2.0])).unwrap_err();
        assert!(matches!(
            err,
            QaError::ShapeMismatch {
                what: "local field",
                expected: 1,
                found: 2
            }
        ));
        assert!(IsingModel::from_edges(2, &[((0, 2), 1.0)], None).is_err());
    }

    #[test]
    fn test_flip_delta_matches_energy() {
        let model = simple_model();
        let mut rng = SmallRng::seed_from_u64(1234);
        for _ in 0..32 {
            let mut state = make_random_spin_state(3, &mut rng);
            for var in 0..3 {
                let before = model.energy(&state).unwrap();
                let delta = model.flip_delta(&state, var);
                state[var] = !state[var];
                let after = model.energy(&state).unwrap();
                assert!((after - before - delta).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_ancilla_preserves_energy() {
        let model = simple_model();
        let embedded = model.with_ancilla().unwrap();
        assert_eq!(embedded.nvars(), 4);
        assert!(!embedded.has_local_field());
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..32 {
            let state = make_random_spin_state(4, &mut rng);
            let logical = IsingModel::resolve_ancilla(&state);
            let e = embedded.energy(&state).unwrap() - model.energy(&logical).unwrap();
            assert!(e.abs() < 1e-12);
        }
    }

    #[test]
    fn test_edges_match_dense() {
        let from_edges =
            IsingModel::from_edges(3, &[((0, 1), 2.0), ((1, 2), -1.0)], Some(&[0.5, 0.0, 0.0]))
                .unwrap();
        let dense = IsingModel::new(
            &[
                vec![0.5, 2.0, 0.0],
                vec![0.0, 0.0, -1.0],
                vec![0.0, 0.0, 0.0],
            ],
            None,
        )
        .unwrap();
        assert_eq!(from_edges, dense);
    }

    #[test]
    fn test_energy_checks_length() {
        let model = simple_model();
        let err = model.energy(&[true, false]).unwrap_err();
        assert!(matches!(
            err,
            QaError::ShapeMismatch {
                what: "state",
                expected: 3,
                found: 2
            }
        ));
    }

    fn simple_qubo() -> QuboModel {
        QuboModel::new(&[
            vec![1.0, -2.0, 0.5],
            vec![-2.0, 1.0, 0.0],
            vec![1.5, 0.0, -0.5],
        ])
        .unwrap()
    }

    #[test]
    fn test_qubo_energy() {
        let q = QuboModel::new(&[vec![1.0, -2.0], vec![-2.0, 1.0]]).unwrap();
        assert_eq!(q.energy(&[false, false]).unwrap(), 0.0);
        assert_eq!(q.energy(&[true, false]).unwrap(), 1.0);
        assert_eq!(q.energy(&[true, true]).unwrap(), -2.0);
        assert!(q.energy(&[true]).is_err());
    }

    #[test]
    fn test_qubo_matches_ising() {
        let q = simple_qubo();
        let (ising, offset) = q.to_ising().unwrap();
        let mut rng = SmallRng::seed_from_u64(99);
        for _ in 0..32 {
            let mut state = make_random_spin_state(3, &mut rng);
            let e = ising.energy(&state).unwrap() + offset;
            assert!((e - q.energy(&state).unwrap()).abs() < 1e-12);
            for var in 0..3 {
                let delta = q.flip_delta(&state, var);
                assert!((delta - ising.flip_delta(&state, var)).abs() < 1e-12);
                let before = q.energy(&state).unwrap();
                state[var] = !state[var];
                assert!((q.energy(&state).unwrap() - before - delta).abs() < 1e-12);
            }
        }
    }
}
