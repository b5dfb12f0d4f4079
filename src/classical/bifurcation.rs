use crate::errors::{require_positive, QaError, Result};
use crate::model::IsingModel;
use rand::Rng;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which bifurcation dynamics to integrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum BifurcationKind {
    /// Kerr nonlinear oscillators, positions are unbounded.
    Adiabatic,
    /// No Kerr term, inelastic walls at `|x| = 1`.
    Ballistic,
    /// Like `Ballistic` but the couplings act on the signs of the positions.
    Discrete,
}

/// Parameters of a bifurcation run.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct BifurcationParams {
    /// Which dynamics to integrate.
    pub kind: BifurcationKind,
    /// Time step.
    pub dt: f64,
    /// Detuning `a0`, also the final pump strength of [`pump_schedule`].
    pub a0: f64,
    /// Coupling strength `c0`.
    pub c0: f64,
    /// Kerr coefficient, only used by the adiabatic dynamics.
    pub kerr: f64,
}

impl Default for BifurcationParams {
    fn default() -> Self {
        Self {
            kind: BifurcationKind::Adiabatic,
            dt: 0.1,
            a0: 0.5,
            c0: 0.3,
            kerr: 1.0,
        }
    }
}

impl BifurcationParams {
    fn check(&self) -> Result<()> {
        require_positive("time step", self.dt)?;
        require_positive("a0", self.a0)?;
        require_positive("c0", self.c0)?;
        if !(self.kerr.is_finite() && self.kerr >= 0.0) {
            return Err(QaError::invalid("kerr coefficient", self.kerr));
        }
        Ok(())
    }
}

/// Simulated bifurcation: one oscillator per spin, integrated with symplectic Euler steps while
/// the pump rises. Spins are read from the signs of the final positions.
///
/// Each step moves the positions with `x += a0 y dt` and then the momenta with
/// `y -= (K x^3 + (a0 - p) x + c0 J x) dt`. The coupling term follows the gradient of
/// `sum_ij J_ij x_i x_j`, so the oscillators settle into low energy states of the model.
/// A local field is embedded into couplings to an ancilla spin first, so the integrated model
/// never carries a field.
#[derive(Debug, Clone)]
pub struct SimulatedBifurcation {
    model: IsingModel,
    embedded: bool,
    params: BifurcationParams,
    x: Vec<f64>,
    y: Vec<f64>,
}

impl SimulatedBifurcation {
    /// Start every oscillator at rest at the origin with a small random momentum in
    /// `[-0.1, 0.1)`.
    pub fn new<R: Rng>(model: &IsingModel, params: BifurcationParams, rng: &mut R) -> Result<Self> {
        let embedded = model.has_local_field();
        let nvars = model.nvars() + usize::from(embedded);
        let momenta = (0..nvars).map(|_| rng.gen_range(-0.1..0.1)).collect();
        Self::new_with_momenta(model, params, momenta)
    }

    /// Start at the origin with the given momenta, one per spin of [`SimulatedBifurcation::model`]
    /// (including the ancilla when the model has a local field).
    pub fn new_with_momenta(
        model: &IsingModel,
        params: BifurcationParams,
        momenta: Vec<f64>,
    ) -> Result<Self> {
        params.check()?;
        let embedded = model.has_local_field();
        let model = if embedded {
            model.with_ancilla()?
        } else {
            model.clone()
        };
        if momenta.len() != model.nvars() {
            return Err(QaError::ShapeMismatch {
                what: "momenta",
                expected: model.nvars(),
                found: momenta.len(),
            });
        }
        if let Some(bad) = momenta.iter().copied().find(|y| !y.is_finite()) {
            return Err(QaError::invalid("momentum", bad));
        }
        Ok(Self {
            x: vec![0.0; model.nvars()],
            y: momenta,
            model,
            embedded,
            params,
        })
    }

    /// The model being integrated, after any ancilla embedding.
    pub fn model(&self) -> &IsingModel {
        &self.model
    }

    /// Oscillator positions.
    pub fn positions(&self) -> &[f64] {
        &self.x
    }

    /// Oscillator momenta.
    pub fn momenta(&self) -> &[f64] {
        &self.y
    }

    /// Take one time step at pump strength `pump`.
    pub fn step(&mut self, pump: f64) -> Result<()> {
        if !pump.is_finite() {
            return Err(QaError::invalid("pump", pump));
        }
        self.integrate(pump);
        Ok(())
    }

    fn integrate(&mut self, pump: f64) {
        let BifurcationParams {
            kind,
            dt,
            a0,
            c0,
            kerr,
        } = self.params;

        self.x
            .iter_mut()
            .zip(self.y.iter())
            .for_each(|(x, y)| *x += a0 * y * dt);

        let x = &self.x;
        let forces = (0..x.len())
            .map(|i| {
                let coupling: f64 = self
                    .model
                    .neighbors(i)
                    .iter()
                    .map(|(k, j)| match kind {
                        BifurcationKind::Discrete => j * sign(x[*k]),
                        _ => j * x[*k],
                    })
                    .sum();
                let nonlinear = match kind {
                    BifurcationKind::Adiabatic => kerr * x[i].powi(3),
                    _ => 0.0,
                };
                nonlinear + (a0 - pump) * x[i] + c0 * coupling
            })
            .collect::<Vec<_>>();
        self.y
            .iter_mut()
            .zip(forces)
            .for_each(|(y, f)| *y -= f * dt);

        if kind != BifurcationKind::Adiabatic {
            self.x.iter_mut().zip(self.y.iter_mut()).for_each(|(x, y)| {
                if x.abs() > 1.0 {
                    *x = sign(*x);
                    *y = 0.0;
                }
            });
        }
    }

    /// Integrate one step per pump strength and return the resulting spins.
    ///
    /// Every pump strength is checked before the first step.
    pub fn run(&mut self, pumps: &[f64]) -> Result<Vec<bool>> {
        if let Some(bad) = pumps.iter().copied().find(|p| !p.is_finite()) {
            return Err(QaError::invalid("pump", bad));
        }
        pumps.iter().for_each(|p| self.integrate(*p));
        Ok(self.state())
    }

    /// Spins read from the signs of the positions of the logical oscillators.
    pub fn state(&self) -> Vec<bool> {
        let signs = self.x.iter().map(|x| *x > 0.0).collect::<Vec<_>>();
        if self.embedded {
            IsingModel::resolve_ancilla(&signs)
        } else {
            signs
        }
    }
}

fn sign(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Pump strengths rising linearly from zero toward `a0` over `steps` steps.
pub fn pump_schedule(a0: f64, steps: usize) -> Vec<f64> {
    (0..steps).map(|i| a0 / steps as f64 * i as f64).collect()
}

/// Run simulated bifurcation over [`pump_schedule`] with random initial momenta.
pub fn run_bifurcation<R: Rng>(
    model: &IsingModel,
    params: BifurcationParams,
    steps: usize,
    mut rng: R,
) -> Result<Vec<bool>> {
    let mut sb = SimulatedBifurcation::new(model, params, &mut rng)?;
    let state = sb.run(&pump_schedule(params.a0, steps))?;
    debug!(
        nvars = model.nvars(),
        steps,
        kind = ?params.kind,
        "simulated bifurcation"
    );
    Ok(state)
}
