use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, QaError>;

/// Failures surfaced by model construction and annealing runs.
///
/// Every variant is raised before the offending schedule step touches any state, so a
/// sampler which returned an error still holds the state from the last completed step.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum QaError {
    /// Dimensions of the couplings, fields or initial state disagree.
    #[error("shape mismatch in {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        /// Which input was malformed.
        what: &'static str,
        /// Expected length.
        expected: usize,
        /// Length actually given.
        found: usize,
    },
    /// A parameter is outside of its allowed range.
    #[error("invalid {name} = {value}{}", step_suffix(.step))]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
        /// Schedule step at which the value was found, if any.
        step: Option<usize>,
    },
    /// The transverse field maps to a non-finite replica coupling.
    #[error("replica coupling {coupling} is not finite for gamma = {gamma} at step {step}")]
    NumericalDegeneracy {
        /// Schedule step.
        step: usize,
        /// Transverse field at that step.
        gamma: f64,
        /// The coupling which was produced.
        coupling: f64,
    },
}

fn step_suffix(step: &Option<usize>) -> String {
    match step {
        Some(step) => format!(" at step {}", step),
        None => String::new(),
    }
}

impl QaError {
    /// The schedule step the error was detected at, if it was detected during a run.
    pub fn step(&self) -> Option<usize> {
        match self {
            QaError::ShapeMismatch { .. } => None,
            QaError::InvalidParameter { step, .. } => *step,
            QaError::NumericalDegeneracy { step, .. } => Some(*step),
        }
    }

    pub(crate) fn invalid(name: &'static str, value: f64) -> Self {
        QaError::InvalidParameter {
            name,
            value,
            step: None,
        }
    }

    pub(crate) fn invalid_at(name: &'static str, value: f64, step: usize) -> Self {
        QaError::InvalidParameter {
            name,
            value,
            step: Some(step),
        }
    }
}

/// Fails unless `value` is finite and strictly positive.
pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(QaError::invalid(name, value))
    }
}
