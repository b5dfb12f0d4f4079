use crate::model::spin;
use crate::sqa::trajectory::SegmentTrajectory;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Per-spin expectation values of pauli-z, with an optional history of one vector per step.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Observables {
    /// Final values, each in `[-1, 1]`.
    pub values: Vec<f64>,
    /// Snapshots taken after each schedule step, if they were requested.
    pub history: Option<Vec<Vec<f64>>>,
}

impl Observables {
    /// Round each value to a spin, `true` where the value is positive.
    pub fn spins(&self) -> Vec<bool> {
        self.values.iter().map(|v| *v > 0.0).collect()
    }

    /// Autocorrelation of the recorded history as a function of lag.
    #[cfg(feature = "autocorrelations")]
    pub fn autocorrelation(&self, use_fft: bool) -> Option<Vec<f64>> {
        match &self.history {
            Some(history) if !history.is_empty() => Some(if use_fft {
                crate::autocorrelations::fft_autocorrelation(history)
            } else {
                crate::autocorrelations::naive_autocorrelation(history)
            }),
            _ => None,
        }
    }
}

/// Accumulates per-step snapshots when asked to, and packages the final output.
#[derive(Debug, Clone, Default)]
pub struct ObservableCollector {
    history: Option<Vec<Vec<f64>>>,
}

impl ObservableCollector {
    /// A collector which keeps snapshots only if `record_history` is set.
    pub fn new(record_history: bool) -> Self {
        Self {
            history: if record_history { Some(vec![]) } else { None },
        }
    }

    /// A recording collector with room for `steps` snapshots.
    pub fn with_capacity(steps: usize) -> Self {
        Self {
            history: Some(Vec::with_capacity(steps)),
        }
    }

    /// Whether snapshots are being kept.
    pub fn is_recording(&self) -> bool {
        self.history.is_some()
    }

    /// Number of snapshots kept so far.
    pub fn len(&self) -> usize {
        self.history.as_ref().map(|h| h.len()).unwrap_or(0)
    }

    /// Whether no snapshot has been kept.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep a snapshot, a no-op unless recording.
    pub fn record(&mut self, values: Vec<f64>) {
        if let Some(history) = self.history.as_mut() {
            history.push(values)
        }
    }

    /// Package the final values with whatever was recorded.
    pub fn finish(self, values: Vec<f64>) -> Observables {
        Observables {
            values,
            history: self.history,
        }
    }
}

/// Average of each logical spin over the replicas of a `nvars * nreplicas` state.
pub fn replica_average(state: &[bool], nvars: usize, nreplicas: usize) -> Vec<f64> {
    assert_eq!(state.len(), nvars * nreplicas);
    let mut acc = vec![0.0; nvars];
    if nvars == 0 {
        return acc;
    }
    state.chunks_exact(nvars).for_each(|replica| {
        acc.iter_mut()
            .zip(replica.iter())
            .for_each(|(a, s)| *a += spin(*s))
    });
    acc.iter_mut().for_each(|a| *a /= nreplicas as f64);
    acc
}

/// True for each logical spin which is +1 in strictly more than half the replicas.
pub fn replica_majority(state: &[bool], nvars: usize, nreplicas: usize) -> Vec<bool> {
    replica_average(state, nvars, nreplicas)
        .into_iter()
        .map(|v| v > 0.0)
        .collect()
}

/// Imaginary time average of each worldline.
pub fn time_averages(trajectories: &[SegmentTrajectory]) -> Vec<f64> {
    trajectories.iter().map(|t| t.time_average()).collect()
}

#[cfg(test)]
mod observable_tests {
    use super::*;

    #[test]
    fn test_replica_average() {
        // Two vars, three replicas.
        let state = vec![true, false, true, true, false, false];
        let avg = replica_average(&state, 2, 3);
        assert!((avg[0] - 1.0 / 3.0).abs() < 1e-12);
        assert!((avg[1] + 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(replica_majority(&state, 2, 3), vec![true, false]);
    }

    #[test]
    fn test_majority_tie_is_false() {
        let state = vec![true, false];
        assert_eq!(replica_majority(&state, 1, 2), vec![false]);
    }

    #[test]
    fn test_collector() {
        let mut c = ObservableCollector::new(false);
        c.record(vec![1.0]);
        assert!(c.is_empty());
        assert_eq!(c.finish(vec![0.5]).history, None);

        let mut c = ObservableCollector::new(true);
        c.record(vec![1.0]);
        c.record(vec![-1.0]);
        assert_eq!(c.len(), 2);
        let obs = c.finish(vec![0.5]);
        assert_eq!(obs.history, Some(vec![vec![1.0], vec![-1.0]]));
        assert_eq!(obs.spins(), vec![true]);
    }

    #[test]
    fn test_time_averages() {
        let ts = vec![
            SegmentTrajectory::new(2.0, true).unwrap(),
            SegmentTrajectory::from_parts(2.0, vec![0.5, 1.0], vec![false, true]).unwrap(),
        ];
        let avg = time_averages(&ts);
        assert_eq!(avg[0], 1.0);
        assert!((avg[1] - 0.5).abs() < 1e-12);
    }
}
