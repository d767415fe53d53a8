use std::sync::Arc;

use crate::codec::Schema;
use crate::config::EnkfConfig;
use crate::error::{Error, Result};
use crate::param::Individual;
use crate::storage::{MemoryStorage, RecordStorage};
use crate::types::{BestIndividual, RunState};

use super::update::materialize;
use super::{BoundingFn, EnkfOptimizer};

/// A builder for [`EnkfOptimizer`].
///
/// Created via [`EnkfOptimizer::builder`]. Holds the collaborators that do
/// not belong in a serialisable configuration.
///
/// # Defaults
///
/// - Bounding: none
/// - Storage: [`MemoryStorage`]
///
/// # Examples
///
/// ```
/// use enkf_optimizer::prelude::*;
///
/// let config = EnkfConfig::default().pop_size(3).observations(vec![1.0]);
/// let opt = EnkfOptimizer::builder(config)
///     .bounding_func(|ind| ind.map_values(|_, v| v.clamp(-1.0, 1.0)))
///     .build(|| Individual::new().with("w", vec![5.0, -5.0]))
///     .unwrap();
///
/// let first = &opt.ask().unwrap()[0];
/// assert_eq!(first.get("w").unwrap().as_slice(), &[1.0, -1.0]);
/// ```
pub struct EnkfOptimizerBuilder {
    config: EnkfConfig,
    bounding: Option<BoundingFn>,
    storage: Option<Arc<dyn RecordStorage>>,
}

impl EnkfOptimizerBuilder {
    pub(super) fn new(config: EnkfConfig) -> Self {
        Self {
            config,
            bounding: None,
            storage: None,
        }
    }

    /// Transform applied to every individual before it is encoded.
    #[must_use]
    pub fn bounding_func(
        mut self,
        f: impl Fn(Individual) -> Individual + Send + Sync + 'static,
    ) -> Self {
        self.bounding = Some(Box::new(f));
        self
    }

    /// Where generation records go.
    #[must_use]
    pub fn storage(mut self, storage: impl RecordStorage + 'static) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    /// Validates the configuration and creates the initial population.
    ///
    /// `create_individual` is called `pop_size` times to capture one schema
    /// per slot and `pop_size` more times for the population itself.
    ///
    /// # Errors
    ///
    /// - [`Error::Configuration`] for an invalid configuration, an empty
    ///   individual, or slots whose flattened widths differ.
    /// - [`Error::SchemaMismatch`] if a created or bounded individual does
    ///   not match its slot schema.
    pub fn build(self, mut create_individual: impl FnMut() -> Individual) -> Result<EnkfOptimizer> {
        self.config.validate()?;
        let policy = self.config.sampling_policy()?;
        let pop_size = self.config.pop_size;

        let schemas: Vec<Schema> = (0..pop_size)
            .map(|_| Schema::capture(&create_individual()))
            .collect();
        let width = schemas.first().map_or(0, Schema::width);
        if width == 0 {
            return Err(Error::config("individuals must hold at least one value"));
        }
        if let Some(slot) = schemas.iter().position(|s| s.width() != width) {
            return Err(Error::config(format!(
                "slot {slot} flattens to {} values, slot 0 to {width}",
                schemas[slot].width()
            )));
        }

        let individuals: Vec<Individual> = (0..pop_size).map(|_| create_individual()).collect();
        let snapshot = materialize(0, individuals, &schemas, self.bounding.as_ref())?;

        trace_info!(
            pop_size,
            dims = width,
            observations = self.config.observations.len(),
            sampling = policy.is_some(),
            "ensemble initialised"
        );

        Ok(EnkfOptimizer {
            rng: fastrand::Rng::with_seed(self.config.seed),
            config: self.config,
            policy,
            schemas,
            bounding: self.bounding,
            storage: self
                .storage
                .unwrap_or_else(|| Arc::new(MemoryStorage::new())),
            snapshot,
            state: RunState::AwaitingFitness { generation: 0 },
            best: BestIndividual::initial(),
            best_params: None,
            current_fitness: f64::NEG_INFINITY,
        })
    }
}
