//! Uniform elite pick with Gaussian perturbation.

use nalgebra::DMatrix;

use super::{Ranking, perturbed_copy};
use crate::kalman::ModelOutput;

/// Replaces every worst slot with a noisy copy of a uniformly drawn elite
/// member; the model-output row is copied unperturbed from the same member.
pub(super) fn replace(
    ensemble: &DMatrix<f64>,
    model_output: &ModelOutput,
    ranking: &Ranking,
    loc: f64,
    scale: f64,
    rng: &mut fastrand::Rng,
) -> (DMatrix<f64>, ModelOutput) {
    let mut next = ensemble.clone();
    let mut next_output = model_output.clone();

    for &slot in &ranking.worst {
        let pick = ranking.best[rng.usize(0..ranking.best.len())];
        perturbed_copy(&mut next, ensemble, slot, pick, (loc, scale), rng);
        next_output.copy_row_from(slot, model_output, pick);
    }

    (next, next_output)
}
