use crate::error::Error;
use crate::types::RunResult;

use super::EnkfOptimizer;

impl EnkfOptimizer {
    /// Runs ask/evaluate/tell until a stop condition fires.
    ///
    /// `evaluate` receives the whole population and returns one scalar
    /// fitness per member; it may parallelise internally. Its errors are
    /// returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns the evaluator's error, or an optimizer [`Error`] converted
    /// through `E: From<Error>`.
    ///
    /// # Examples
    ///
    /// ```
    /// use enkf_optimizer::prelude::*;
    ///
    /// let config = EnkfConfig::default()
    ///     .pop_size(8)
    ///     .n_iteration(5)
    ///     .observations(vec![0.0]);
    /// let mut opt = EnkfOptimizer::builder(config)
    ///     .build(|| Individual::new().with("x", 2.0))
    ///     .unwrap();
    ///
    /// let result = opt
    ///     .optimize(|population| {
    ///         Ok::<_, Error>(
    ///             population
    ///                 .iter()
    ///                 .map(|ind| -ind.get("x").map_or(0.0, |v| v.as_slice()[0]).powi(2))
    ///                 .collect(),
    ///         )
    ///     })
    ///     .unwrap();
    /// assert_eq!(result.generations, 5);
    /// ```
    pub fn optimize<E, F>(&mut self, mut evaluate: F) -> Result<RunResult, E>
    where
        E: From<Error>,
        F: FnMut(&[crate::Individual]) -> Result<Vec<f64>, E>,
    {
        self.optimize_vectors(|population| {
            Ok(evaluate(population)?.into_iter().map(|v| vec![v]).collect())
        })
    }

    /// Like [`optimize`](Self::optimize) with one fitness vector per member.
    ///
    /// # Errors
    ///
    /// See [`optimize`](Self::optimize).
    pub fn optimize_vectors<E, F>(&mut self, mut evaluate: F) -> Result<RunResult, E>
    where
        E: From<Error>,
        F: FnMut(&[crate::Individual]) -> Result<Vec<Vec<f64>>, E>,
    {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "optimize",
            pop_size = self.config.pop_size,
            n_iteration = self.config.n_iteration
        )
        .entered();

        while let Some(population) = self.ask() {
            let fitness = evaluate(population)?;
            self.tell_vectors(&fitness)?;
        }
        Ok(self.result())
    }
}
