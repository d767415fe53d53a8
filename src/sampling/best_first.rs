//! Rank-ordered elite scan with probabilistic acceptance.

use nalgebra::DMatrix;

use super::{Ranking, perturbed_copy};
use crate::kalman::ModelOutput;

/// For each worst slot, walks the elite best-first and accepts a candidate
/// with probability `pick_probability`. A slot where no candidate is
/// accepted keeps its current values.
pub(super) fn replace(
    ensemble: &DMatrix<f64>,
    model_output: &ModelOutput,
    ranking: &Ranking,
    pick_probability: f64,
    noise: (f64, f64),
    rng: &mut fastrand::Rng,
) -> (DMatrix<f64>, ModelOutput) {
    let mut next = ensemble.clone();
    let mut next_output = model_output.clone();

    for &slot in &ranking.worst {
        for &candidate in &ranking.best {
            if rng.f64() < pick_probability {
                perturbed_copy(&mut next, ensemble, slot, candidate, noise, rng);
                next_output.copy_row_from(slot, model_output, candidate);
                break;
            }
        }
    }

    (next, next_output)
}
