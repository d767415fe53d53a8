//! Per-feature histogram resampling.
//!
//! Each feature gets its own empirical distribution built from the elite:
//! a bin is chosen with probability proportional to its count and a value
//! is drawn uniformly inside it. Features are sampled independently.

use nalgebra::DMatrix;

use super::{Ranking, repick_outputs};
use crate::kalman::ModelOutput;
use crate::rng_util;

/// Equal-width histogram over one feature of the elite.
#[derive(Clone, Debug)]
struct Histogram {
    low: f64,
    width: f64,
    counts: Vec<usize>,
    total: usize,
}

impl Histogram {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn new(values: &[f64], bins: usize) -> Self {
        let low = values.iter().copied().fold(f64::INFINITY, f64::min);
        let high = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let width = (high - low) / bins as f64;

        let mut counts = vec![0; bins];
        for &v in values {
            let bin = if width > 0.0 {
                (((v - low) / width).floor() as usize).min(bins - 1)
            } else {
                0
            };
            counts[bin] += 1;
        }
        Self {
            low,
            width,
            counts,
            total: values.len(),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn sample(&self, rng: &mut fastrand::Rng) -> f64 {
        if self.width.is_nan() || self.width <= 0.0 {
            return self.low;
        }
        let mut target = rng.usize(0..self.total);
        let mut bin = 0;
        for (i, &count) in self.counts.iter().enumerate() {
            if target < count {
                bin = i;
                break;
            }
            target -= count;
        }
        let start = self.low + bin as f64 * self.width;
        rng_util::f64_range(rng, start, start + self.width)
    }
}

pub(super) fn replace(
    ensemble: &DMatrix<f64>,
    model_output: &ModelOutput,
    ranking: &Ranking,
    bins: usize,
    rng: &mut fastrand::Rng,
) -> (DMatrix<f64>, ModelOutput) {
    let histograms: Vec<Histogram> = (0..ensemble.ncols())
        .map(|j| {
            let column: Vec<f64> = ranking.best.iter().map(|&i| ensemble[(i, j)]).collect();
            Histogram::new(&column, bins)
        })
        .collect();

    let mut next = ensemble.clone();
    for &slot in &ranking.worst {
        for (j, histogram) in histograms.iter().enumerate() {
            next[(slot, j)] = histogram.sample(rng);
        }
    }

    let next_output = repick_outputs(model_output, &ranking.worst, &ranking.best, rng);
    (next, next_output)
}
