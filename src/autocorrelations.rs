use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::ops::DivAssign;

/// Autocorrelation of a history of observable vectors, averaged over the components.
///
/// The history is treated as periodic. Components which never change are skipped.
pub fn fft_autocorrelation(samples: &[Vec<f64>]) -> Vec<f64> {
    let tmax = samples.len();
    let n = match samples.first() {
        Some(sample) => sample.len(),
        None => return vec![],
    };

    let means = (0..n)
        .map(|i| (0..tmax).map(|t| samples[t][i]).sum::<f64>() / tmax as f64)
        .collect::<Vec<_>>();

    let mut input = (0..n)
        .filter_map(|i| {
            let mut v = (0..tmax)
                .map(|t| Complex::<f64>::new(samples[t][i] - means[i], 0.0))
                .collect::<Vec<Complex<f64>>>();
            let norm = v.iter().map(|v| v.norm_sqr()).sum::<f64>().sqrt();
            if norm == 0.0 {
                None
            } else {
                v.iter_mut().for_each(|c| c.div_assign(norm));
                Some(v)
            }
        })
        .collect::<Vec<_>>();
    let nonconstant = input.len();
    if nonconstant == 0 {
        return vec![0.0; tmax];
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(tmax);
    let ifft = planner.plan_fft_inverse(tmax);

    input.iter_mut().for_each(|v| {
        fft.process(v);
        v.iter_mut()
            .for_each(|c| *c = Complex::new(c.norm_sqr(), 0.0));
        ifft.process(v);
    });

    // The inverse transform is unnormalized.
    (0..tmax)
        .map(|t| {
            input.iter().map(|v| v[t].re).sum::<f64>() / ((nonconstant * tmax) as f64)
        })
        .collect()
}

/// Direct O(T^2) version of [`fft_autocorrelation`], parallel over lags.
pub fn naive_autocorrelation(samples: &[Vec<f64>]) -> Vec<f64> {
    let tmax = samples.len();
    let n: usize = match samples.first() {
        Some(sample) => sample.len(),
        None => return vec![],
    };
    let mu = (0..n)
        .map(|i| -> f64 {
            let total = samples.iter().map(|sample| sample[i]).sum::<f64>();
            total / samples.len() as f64
        })
        .collect::<Vec<_>>();
    let norms = (0..n)
        .map(|i| samples.iter().map(|s| (s[i] - mu[i]).powi(2)).sum::<f64>())
        .collect::<Vec<_>>();
    let live = (0..n).filter(|i| norms[*i] > 0.0).collect::<Vec<_>>();
    if live.is_empty() {
        return vec![0.0; tmax];
    }

    (0..tmax)
        .into_par_iter()
        .map(|tau| {
            live.iter()
                .map(|&i| {
                    let d = (0..tmax)
                        .map(|t| {
                            (samples[t][i] - mu[i]) * (samples[(t + tau) % tmax][i] - mu[i])
                        })
                        .sum::<f64>();
                    d / norms[i]
                })
                .sum::<f64>()
                / live.len() as f64
        })
        .collect::<Vec<_>>()
}
