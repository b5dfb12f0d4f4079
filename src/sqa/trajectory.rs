use crate::errors::{require_positive, QaError, Result};
use crate::model::spin;
use rand::Rng;
#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// The imaginary time worldline of a single spin.
///
/// The worldline is piecewise constant on the circle `[0, beta)`. Each cut at `cuts_pos[k]`
/// starts a segment holding `cuts_val[k]` which lasts until the next cut; the segment after the
/// last cut wraps through `beta` back to the first cut. Without cuts (or with a single one) the
/// spin is constant and `cuts_val[0]` is its value, so there is always at least one value.
///
/// After [`SegmentTrajectory::cleanup`] no two cyclically adjacent segments share a value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct SegmentTrajectory {
    beta: f64,
    cuts_pos: Vec<f64>,
    cuts_val: Vec<bool>,
}

impl SegmentTrajectory {
    /// A spin constant in imaginary time.
    pub fn new(beta: f64, value: bool) -> Result<Self> {
        let beta = require_positive("beta", beta)?;
        Ok(Self {
            beta,
            cuts_pos: vec![],
            cuts_val: vec![value],
        })
    }

    /// A worldline with `kinks` uniform cuts and independent uniform segment values, cleaned up.
    pub fn random<R: Rng>(beta: f64, kinks: usize, rng: &mut R) -> Result<Self> {
        let beta = require_positive("beta", beta)?;
        let mut cuts_pos = (0..kinks)
            .map(|_| rng.gen_range(0.0..beta))
            .collect::<Vec<_>>();
        cuts_pos.sort_by(f64::total_cmp);
        cuts_pos.dedup();
        let nvals = cuts_pos.len().max(1);
        let cuts_val = (0..nvals).map(|_| rng.gen()).collect();
        let mut traj = Self {
            beta,
            cuts_pos,
            cuts_val,
        };
        traj.cleanup();
        Ok(traj)
    }

    /// Build a worldline from raw parts.
    ///
    /// Positions must be strictly increasing inside `[0, beta)` and there must be
    /// `max(len(positions), 1)` values. The result is not cleaned up.
    pub fn from_parts(beta: f64, cuts_pos: Vec<f64>, cuts_val: Vec<bool>) -> Result<Self> {
        let beta = require_positive("beta", beta)?;
        if cuts_val.len() != cuts_pos.len().max(1) {
            return Err(QaError::ShapeMismatch {
                what: "segment values",
                expected: cuts_pos.len().max(1),
                found: cuts_val.len(),
            });
        }
        if let Some(p) = cuts_pos.iter().copied().find(|p| !(0.0..beta).contains(p)) {
            return Err(QaError::invalid("cut position", p));
        }
        if let Some(w) = cuts_pos.windows(2).find(|w| w[0] >= w[1]) {
            return Err(QaError::invalid("cut position", w[1]));
        }
        Ok(Self {
            beta,
            cuts_pos,
            cuts_val,
        })
    }

    /// Length of the imaginary time circle.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Cut positions.
    pub fn cuts(&self) -> &[f64] {
        &self.cuts_pos
    }

    /// Segment values, `values()[k]` being the value after `cuts()[k]`.
    pub fn values(&self) -> &[bool] {
        &self.cuts_val
    }

    /// First index whose cut lies strictly after `t`.
    fn upper_bound(&self, t: f64) -> usize {
        self.cuts_pos.partition_point(|p| *p <= t)
    }

    /// Value of the segment which ends at cut `idx`, wrapping to the last for `idx == 0`.
    fn value_before(&self, idx: usize) -> bool {
        let n = self.cuts_val.len();
        self.cuts_val[(idx + n - 1) % n]
    }

    /// Value of the worldline at time `t`.
    pub fn value_at(&self, t: f64) -> bool {
        if self.cuts_pos.len() <= 1 {
            self.cuts_val[0]
        } else {
            self.value_before(self.upper_bound(t))
        }
    }

    /// Insert new cuts without changing the value anywhere.
    ///
    /// Each new cut copies the value of the segment it lands in, so it is redundant until one
    /// of the two halves is flipped. A position equal to an existing cut is ignored. Every
    /// position is checked before the first is inserted.
    pub fn insert_kinks<It>(&mut self, positions: It) -> Result<()>
    where
        It: IntoIterator<Item = f64>,
        It::IntoIter: Clone,
    {
        let positions = positions.into_iter();
        if let Some(p) = positions.clone().find(|p| !(0.0..self.beta).contains(p)) {
            return Err(QaError::invalid("cut position", p));
        }
        for p in positions {
            let idx = self.upper_bound(p);
            if idx > 0 && self.cuts_pos[idx - 1] == p {
                continue;
            }
            if !self.cuts_pos.is_empty() {
                let v = self.value_before(idx);
                self.cuts_val.insert(idx, v);
            }
            self.cuts_pos.insert(idx, p);
        }
        Ok(())
    }

    /// Drop every cut which does not change the value.
    pub fn cleanup(&mut self) {
        let mut k = self.cuts_pos.len();
        while k > 0 {
            k -= 1;
            let n = self.cuts_pos.len();
            if n <= 1 {
                self.cuts_pos.clear();
                self.cuts_val.truncate(1);
                break;
            }
            if self.cuts_val[k] == self.value_before(k) {
                self.cuts_pos.remove(k);
                self.cuts_val.remove(k);
            }
        }
    }

    /// Number of segments; a constant worldline has one.
    pub fn segment_count(&self) -> usize {
        self.cuts_val.len()
    }

    /// Segment `k` as `(start, end, value)`.
    ///
    /// For a constant worldline `start == end` and the segment covers the whole circle.
    /// The last segment of a worldline with cuts wraps around, so `end < start`.
    pub fn segment(&self, k: usize) -> (f64, f64, bool) {
        match self.cuts_pos.len() {
            0 => (0.0, 0.0, self.cuts_val[0]),
            1 => (self.cuts_pos[0], self.cuts_pos[0], self.cuts_val[0]),
            n => (
                self.cuts_pos[k],
                self.cuts_pos[(k + 1) % n],
                self.cuts_val[k],
            ),
        }
    }

    /// Length of segment `k`.
    pub fn segment_duration(&self, k: usize) -> f64 {
        let (start, end, _) = self.segment(k);
        if end > start {
            end - start
        } else {
            self.beta - start + end
        }
    }

    /// Flip the value of segment `k`.
    pub fn flip_segment(&mut self, k: usize) {
        self.cuts_val[k] = !self.cuts_val[k];
    }

    /// Integral of the worldline over the periodic range `[t0, t1)`.
    ///
    /// `t0 > t1` wraps through `beta`, and `t0 == t1` is the whole circle.
    pub fn integrate(&self, t0: f64, t1: f64) -> f64 {
        if t0 > t1 {
            let head = self.integrate(t0, self.beta);
            // A range ending exactly at zero has nothing left after the wrap.
            return if t1 > 0.0 {
                head + self.integrate(0.0, t1)
            } else {
                head
            };
        }
        if self.cuts_pos.len() <= 1 {
            let v = spin(self.cuts_val[0]);
            return if t0 == t1 { self.beta * v } else { (t1 - t0) * v };
        }
        if t0 == t1 {
            return self.total();
        }

        let first = self.upper_bound(t0);
        let last = self.upper_bound(t1);
        if first == last {
            return (t1 - t0) * spin(self.value_before(first));
        }
        // Partial segment up to the first cut inside the range.
        let head = (self.cuts_pos[first] - t0) * spin(self.value_before(first));
        let interior: f64 = (first..last - 1)
            .map(|k| (self.cuts_pos[k + 1] - self.cuts_pos[k]) * spin(self.cuts_val[k]))
            .sum();
        let tail = (t1 - self.cuts_pos[last - 1]) * spin(self.cuts_val[last - 1]);
        head + interior + tail
    }

    /// Integral over the full circle.
    fn total(&self) -> f64 {
        let n = self.cuts_pos.len();
        if n <= 1 {
            return self.beta * spin(self.cuts_val[0]);
        }
        let wrap = (self.beta - self.cuts_pos[n - 1] + self.cuts_pos[0]) * spin(self.cuts_val[n - 1]);
        self.cuts_pos
            .windows(2)
            .zip(self.cuts_val.iter())
            .map(|(w, v)| (w[1] - w[0]) * spin(*v))
            .sum::<f64>()
            + wrap
    }

    /// Average value of the spin over imaginary time, in `[-1, 1]`.
    pub fn time_average(&self) -> f64 {
        self.total() / self.beta
    }

    /// Whether cuts are sorted inside `[0, beta)` and values line up with them.
    pub fn verify(&self) -> bool {
        self.cuts_val.len() == self.cuts_pos.len().max(1)
            && self.cuts_pos.iter().all(|p| (0.0..self.beta).contains(p))
            && self.cuts_pos.windows(2).all(|w| w[0] < w[1])
    }

    /// Whether no two cyclically adjacent segments hold the same value.
    pub fn is_clean(&self) -> bool {
        let n = self.cuts_pos.len();
        n == 0 || (n > 1 && (0..n).all(|k| self.cuts_val[k] != self.value_before(k)))
    }
}
