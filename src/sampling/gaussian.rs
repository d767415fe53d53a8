//! Multivariate normal fitted to the elite.

use nalgebra::{DMatrix, DVector};

use super::{Ranking, repick_outputs};
use crate::kalman::ModelOutput;
use crate::rng_util;

/// Mean and sample covariance of the elite rows.
///
/// A single elite member yields a zero covariance.
#[allow(clippy::cast_precision_loss)]
fn fit(ensemble: &DMatrix<f64>, best: &[usize]) -> (DVector<f64>, DMatrix<f64>) {
    let d = ensemble.ncols();
    let n = best.len();

    let mut mean = DVector::zeros(d);
    for &i in best {
        mean += ensemble.row(i).transpose();
    }
    mean /= n as f64;

    let mut cov = DMatrix::zeros(d, d);
    if n > 1 {
        for &i in best {
            let y = ensemble.row(i).transpose() - &mean;
            cov += &y * y.transpose();
        }
        cov /= (n - 1) as f64;
    }
    (mean, cov)
}

/// Replaces the whole worst group with one batch of draws from
/// `N(mean, cov)` of the elite, then re-picks their model-output rows.
pub(super) fn replace(
    ensemble: &DMatrix<f64>,
    model_output: &ModelOutput,
    ranking: &Ranking,
    rng: &mut fastrand::Rng,
) -> (DMatrix<f64>, ModelOutput) {
    let d = ensemble.ncols();
    let (mean, cov) = fit(ensemble, &ranking.best);

    // x = mean + B * sqrt(D) * z, with cov = B D B^T
    let eigen = cov.symmetric_eigen();
    let scales = eigen.eigenvalues.map(|v| v.max(0.0).sqrt());
    let transform = &eigen.eigenvectors * DMatrix::from_diagonal(&scales);

    let mut next = ensemble.clone();
    for &slot in &ranking.worst {
        let z = DVector::from_fn(d, |_, _| rng_util::standard_normal(rng));
        let x = &mean + &transform * z;
        next.set_row(slot, &x.transpose());
    }

    let next_output = repick_outputs(model_output, &ranking.worst, &ranking.best, rng);
    (next, next_output)
}
