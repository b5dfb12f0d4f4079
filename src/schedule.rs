use crate::errors::{require_positive, QaError, Result};
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Transverse field strengths, one per sweep.
///
/// Entries are finite and non-negative. They are usually decreasing toward zero but nothing
/// requires it; the samplers decide which values they can handle at each step.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct AnnealingSchedule {
    gammas: Vec<f64>,
}

impl AnnealingSchedule {
    /// Make a schedule from explicit field strengths.
    pub fn new(gammas: Vec<f64>) -> Result<Self> {
        if let Some((step, gamma)) = gammas
            .iter()
            .copied()
            .enumerate()
            .find(|(_, g)| !(g.is_finite() && *g >= 0.0))
        {
            return Err(QaError::invalid_at("transverse field", gamma, step));
        }
        Ok(Self { gammas })
    }

    /// `steps` evenly spaced values from `start` to `end`, both included.
    pub fn linear(start: f64, end: f64, steps: usize) -> Result<Self> {
        let gammas = match steps {
            0 => vec![],
            1 => vec![start],
            _ => {
                let delta = (end - start) / (steps - 1) as f64;
                (0..steps)
                    .map(|i| {
                        if i == steps - 1 {
                            end
                        } else {
                            start + delta * i as f64
                        }
                    })
                    .collect()
            }
        };
        Self::new(gammas)
    }

    /// `steps` values decaying by a constant ratio from `start` to `end`, both included.
    pub fn geometric(start: f64, end: f64, steps: usize) -> Result<Self> {
        require_positive("geometric start", start)?;
        require_positive("geometric end", end)?;
        let gammas = match steps {
            0 => vec![],
            1 => vec![start],
            _ => {
                let ratio = (end / start).powf(1.0 / (steps - 1) as f64);
                (0..steps)
                    .map(|i| {
                        if i == steps - 1 {
                            end
                        } else {
                            start * ratio.powi(i as i32)
                        }
                    })
                    .collect()
            }
        };
        Self::new(gammas)
    }

    /// Number of sweeps.
    pub fn len(&self) -> usize {
        self.gammas.len()
    }

    /// Whether there are no sweeps at all.
    pub fn is_empty(&self) -> bool {
        self.gammas.is_empty()
    }

    /// The first field strength, if any.
    pub fn first(&self) -> Option<f64> {
        self.gammas.first().copied()
    }

    /// Iterate over field strengths.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.gammas.iter().copied()
    }

    /// Field strengths as a slice.
    pub fn as_slice(&self) -> &[f64] {
        &self.gammas
    }
}

impl Index<usize> for AnnealingSchedule {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.gammas[index]
    }
}
