//! The generation controller.
//!
//! [`EnkfOptimizer`] owns one run: the captured schemas, the latest
//! [`GenerationSnapshot`], the best record and the seeded RNG. Each call to
//! [`tell`](EnkfOptimizer::tell) feeds the fitness of the population handed
//! out by [`ask`](EnkfOptimizer::ask) and either emits the next population
//! or terminates the run.

mod builder;
mod run;
mod update;

use std::sync::Arc;

use nalgebra::DMatrix;

pub use builder::EnkfOptimizerBuilder;
pub use update::GenerationSnapshot;

use crate::codec::Schema;
use crate::config::EnkfConfig;
use crate::error::{Error, Result};
use crate::param::Individual;
use crate::sampling::SamplingPolicy;
use crate::storage::RecordStorage;
use crate::types::{BestIndividual, GenerationRecord, RunResult, RunState, Step};

use update::UpdateContext;

/// Optional transform applied to every individual before it is encoded.
pub type BoundingFn = Box<dyn Fn(Individual) -> Individual + Send + Sync>;

/// Ensemble Kalman Filter optimizer driven through ask/tell.
///
/// Fitness is maximised. Build one with [`EnkfOptimizer::builder`].
///
/// # Examples
///
/// ```
/// use enkf_optimizer::prelude::*;
///
/// let config = EnkfConfig::default()
///     .pop_size(4)
///     .n_iteration(3)
///     .observations(vec![0.0]);
/// let mut opt = EnkfOptimizer::builder(config)
///     .build(|| Individual::new().with("x", 1.0))
///     .unwrap();
///
/// while let Some(population) = opt.ask() {
///     let fitness: Vec<f64> = population
///         .iter()
///         .map(|ind| -ind.get("x").and_then(ParamValue::as_scalar).unwrap_or(0.0).abs())
///         .collect();
///     opt.tell(&fitness).unwrap();
/// }
///
/// let result = opt.finish().unwrap();
/// assert_eq!(result.generations, 3);
/// ```
pub struct EnkfOptimizer {
    config: EnkfConfig,
    policy: Option<SamplingPolicy>,
    schemas: Vec<Schema>,
    bounding: Option<BoundingFn>,
    storage: Arc<dyn RecordStorage>,
    rng: fastrand::Rng,
    snapshot: GenerationSnapshot,
    state: RunState,
    best: BestIndividual,
    best_params: Option<Individual>,
    current_fitness: f64,
}

impl EnkfOptimizer {
    /// Starts configuring an optimizer.
    #[must_use]
    pub fn builder(config: EnkfConfig) -> EnkfOptimizerBuilder {
        EnkfOptimizerBuilder::new(config)
    }

    /// The population awaiting fitness, or `None` once the run has terminated.
    #[must_use]
    pub fn ask(&self) -> Option<&[Individual]> {
        match self.state {
            RunState::AwaitingFitness { .. } => Some(self.snapshot.population()),
            RunState::Terminated => None,
        }
    }

    /// Feeds one scalar fitness per member.
    ///
    /// Only meaningful with a single observation; use
    /// [`tell_vectors`](Self::tell_vectors) otherwise.
    ///
    /// # Errors
    ///
    /// See [`tell_vectors`](Self::tell_vectors).
    pub fn tell(&mut self, fitness: &[f64]) -> Result<Step> {
        let vectors: Vec<Vec<f64>> = fitness.iter().map(|&v| vec![v]).collect();
        self.tell_vectors(&vectors)
    }

    /// Feeds one fitness vector per member and advances the run.
    ///
    /// A member's scalar fitness is the largest value of its vector. On
    /// error nothing changes and the same population can be told again.
    ///
    /// # Errors
    ///
    /// - [`Error::Terminated`] once the run has ended.
    /// - [`Error::DimensionMismatch`] if `fitness.len() != pop_size` or a
    ///   vector's length is not a multiple of the observation count.
    /// - [`Error::NonFiniteFitness`] if any reported value is NaN or infinite.
    /// - [`Error::NumericalInstability`] if the Kalman update is singular.
    /// - [`Error::SchemaMismatch`] if the bounding transform breaks the schema.
    pub fn tell_vectors(&mut self, fitness: &[Vec<f64>]) -> Result<Step> {
        if self.state == RunState::Terminated {
            return Err(Error::Terminated);
        }

        let ctx = UpdateContext {
            config: &self.config,
            policy: self.policy.as_ref(),
            schemas: &self.schemas,
            bounding: self.bounding.as_ref(),
        };
        let mut rng = self.rng.clone();
        let outcome = update::advance(&self.snapshot, fitness, self.best, &ctx, &mut rng)?;

        let generation = self.snapshot.generation();
        self.storage
            .push(GenerationRecord::new(generation, &outcome.weights));

        #[cfg(feature = "tracing")]
        {
            let scores: Vec<f64> = fitness
                .iter()
                .map(Vec::as_slice)
                .map(update::member_fitness)
                .collect();
            let order = crate::sampling::rank(&scores, 1.0, 0.0).best;
            let sorted: Vec<f64> = order.iter().map(|&i| scores[i]).collect();
            #[allow(clippy::cast_precision_loss)]
            let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
            tracing::info!(
                generation,
                best = outcome.generation_max,
                mean,
                fitness = ?sorted,
                ranking = ?order,
                "generation processed"
            );
        }

        if outcome.best.fitness > self.best.fitness {
            self.best_params = self
                .snapshot
                .population()
                .get(outcome.best.individual)
                .cloned();
            trace_info!(
                generation,
                individual = outcome.best.individual,
                fitness = outcome.best.fitness,
                "new best individual"
            );
        }
        self.best = outcome.best;
        self.current_fitness = outcome.generation_max;
        self.rng = rng;

        if let Some(next) = outcome.next {
            let next_generation = next.generation();
            self.snapshot = next;
            self.state = RunState::AwaitingFitness {
                generation: next_generation,
            };
            Ok(Step::Continue {
                generation: next_generation,
            })
        } else {
            self.state = RunState::Terminated;
            trace_info!(
                generation = self.best.generation,
                individual = self.best.individual,
                fitness = self.best.fitness,
                "run terminated"
            );
            Ok(Step::Terminated(self.best))
        }
    }

    /// The final record, once the run has terminated.
    #[must_use]
    pub fn finish(&self) -> Option<RunResult> {
        (self.state == RunState::Terminated).then(|| self.result())
    }

    fn result(&self) -> RunResult {
        RunResult {
            best: self.best,
            individual: self.best_params.clone(),
            generations: self.snapshot.generation() + 1,
        }
    }

    /// Index of the current generation.
    #[must_use]
    pub fn generation(&self) -> usize {
        self.snapshot.generation()
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Best record so far.
    #[must_use]
    pub fn best(&self) -> BestIndividual {
        self.best
    }

    /// Parameters of the best individual so far.
    #[must_use]
    pub fn best_individual(&self) -> Option<&Individual> {
        self.best_params.as_ref()
    }

    /// Flat parameters of the current population, one row per member.
    #[must_use]
    pub fn ensemble(&self) -> &DMatrix<f64> {
        self.snapshot.ensemble()
    }

    /// The latest generation snapshot.
    #[must_use]
    pub fn snapshot(&self) -> &GenerationSnapshot {
        &self.snapshot
    }

    /// Per-slot schemas captured at construction.
    #[must_use]
    pub fn schemas(&self) -> &[Schema] {
        &self.schemas
    }

    /// Highest member fitness of the last processed generation, `-inf` before the first.
    #[must_use]
    pub fn current_fitness(&self) -> f64 {
        self.current_fitness
    }

    /// The validated configuration.
    #[must_use]
    pub fn config(&self) -> &EnkfConfig {
        &self.config
    }

    /// The record storage.
    #[must_use]
    pub fn storage(&self) -> &dyn RecordStorage {
        &*self.storage
    }
}
