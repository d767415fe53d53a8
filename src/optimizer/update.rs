//! The per-generation transition: snapshot + fitness → next snapshot.

use nalgebra::DMatrix;

use crate::codec::Schema;
use crate::config::EnkfConfig;
use crate::error::{Error, Result};
use crate::kalman::{EnsembleKalmanFilter, ModelOutput};
use crate::param::Individual;
use crate::sampling::SamplingPolicy;
use crate::types::BestIndividual;

use super::BoundingFn;

/// One generation's population, immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationSnapshot {
    generation: usize,
    ensemble: DMatrix<f64>,
    population: Vec<Individual>,
}

impl GenerationSnapshot {
    /// Generation index.
    #[must_use]
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// `pop_size × d` flat parameters, one row per member.
    #[must_use]
    pub fn ensemble(&self) -> &DMatrix<f64> {
        &self.ensemble
    }

    /// Decoded, bounded individuals in slot order.
    #[must_use]
    pub fn population(&self) -> &[Individual] {
        &self.population
    }
}

/// Everything a transition reads besides the snapshot itself.
pub(super) struct UpdateContext<'a> {
    pub(super) config: &'a EnkfConfig,
    pub(super) policy: Option<&'a SamplingPolicy>,
    pub(super) schemas: &'a [Schema],
    pub(super) bounding: Option<&'a BoundingFn>,
}

/// Result of processing one generation.
#[derive(Debug)]
pub(super) struct Outcome {
    /// Ensemble produced by the Kalman update.
    pub(super) weights: DMatrix<f64>,
    /// Best record after this generation.
    pub(super) best: BestIndividual,
    /// Highest member fitness of this generation.
    pub(super) generation_max: f64,
    /// Next population, or `None` when a stop condition fired.
    pub(super) next: Option<GenerationSnapshot>,
}

/// Applies the bounding transform, validates every member against its slot
/// schema and stacks the flat vectors into a snapshot.
pub(super) fn materialize(
    generation: usize,
    individuals: Vec<Individual>,
    schemas: &[Schema],
    bounding: Option<&BoundingFn>,
) -> Result<GenerationSnapshot> {
    if individuals.len() != schemas.len() {
        return Err(Error::DimensionMismatch {
            context: "individuals vs population slots",
            expected: schemas.len(),
            got: individuals.len(),
        });
    }
    let population: Vec<Individual> = match bounding {
        Some(f) => individuals.into_iter().map(f).collect(),
        None => individuals,
    };
    let rows = population
        .iter()
        .zip(schemas)
        .map(|(ind, schema)| schema.encode(ind))
        .collect::<Result<Vec<_>>>()?;

    let width = schemas.first().map_or(0, Schema::width);
    let ensemble = DMatrix::from_row_iterator(rows.len(), width, rows.into_iter().flatten());
    Ok(GenerationSnapshot {
        generation,
        ensemble,
        population,
    })
}

/// A member's scalar fitness: the largest value it reported.
pub(super) fn member_fitness(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Processes the fitness of `snapshot` and builds the next generation.
///
/// Nothing is mutated except `rng`; on error the caller's state stays as it was.
pub(super) fn advance(
    snapshot: &GenerationSnapshot,
    fitness: &[Vec<f64>],
    best: BestIndividual,
    ctx: &UpdateContext<'_>,
    rng: &mut fastrand::Rng,
) -> Result<Outcome> {
    let pop_size = snapshot.ensemble.nrows();
    if fitness.len() != pop_size {
        return Err(Error::DimensionMismatch {
            context: "fitness vector vs pop_size",
            expected: pop_size,
            got: fitness.len(),
        });
    }
    if let Some(member) = fitness.iter().position(|f| f.iter().any(|v| !v.is_finite())) {
        return Err(Error::NonFiniteFitness { member });
    }
    let k = ctx.config.observations.len();
    let model_output = ModelOutput::from_fitness(fitness, k)?;

    let scores: Vec<f64> = fitness.iter().map(Vec::as_slice).map(member_fitness).collect();
    let (argmax, generation_max) = scores.iter().copied().enumerate().fold(
        (0, f64::NEG_INFINITY),
        |acc, (i, v)| if v > acc.1 { (i, v) } else { acc },
    );
    let best = if generation_max > best.fitness {
        BestIndividual {
            generation: snapshot.generation,
            individual: argmax,
            fitness: generation_max,
        }
    } else {
        best
    };

    let (ensemble, model_output) = match ctx.policy {
        Some(policy) => policy.apply(&snapshot.ensemble, &model_output, &scores, rng)?,
        None => (snapshot.ensemble.clone(), model_output),
    };

    // Unlike `noise_matrix`, a zero scale stays zero here.
    let gamma = DMatrix::identity(k, k) * ctx.config.gamma;
    let mut enkf = EnsembleKalmanFilter::new(ctx.config.maxit);
    let weights = enkf
        .fit(&ensemble, &ctx.config.observations, &model_output, &gamma)?
        .clone();

    let next = if should_stop(ctx.config, snapshot.generation, best.fitness) {
        None
    } else {
        let individuals = weights
            .row_iter()
            .zip(ctx.schemas)
            .map(|(row, schema)| {
                let flat: Vec<f64> = row.iter().copied().collect();
                schema.decode(&flat)
            })
            .collect::<Result<Vec<_>>>()?;
        Some(materialize(
            snapshot.generation + 1,
            individuals,
            ctx.schemas,
            ctx.bounding,
        )?)
    };

    Ok(Outcome {
        weights,
        best,
        generation_max,
        next,
    })
}

/// Stop once `generation + 1` generations are done or the best fitness
/// reached `stop_criterion`.
pub(super) fn should_stop(config: &EnkfConfig, generation: usize, best_fitness: f64) -> bool {
    generation + 1 >= config.n_iteration || best_fitness >= config.stop_criterion
}
