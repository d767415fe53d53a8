//! Run configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sampling::{PickMethod, PolicyKwargs, SamplingPolicy};

/// All recognised options of an EnKF run.
///
/// Fields are public and every field has a fluent setter of the same name.
///
/// # Defaults
///
/// | option | default |
/// |--------|---------|
/// | `gamma` | `0.01` |
/// | `maxit` | `1` |
/// | `pop_size` | `10` |
/// | `seed` | `0` |
/// | `n_iteration` | `10` |
/// | `stop_criterion` | `+inf` (never stop early) |
/// | `sample` | `false` |
/// | `best_n`, `worst_n` | `0.25` |
/// | `pick_method` | `"random"` |
/// | `kwargs` | [`PolicyKwargs::default`] |
/// | `observations` | empty (must be set) |
///
/// # Examples
///
/// ```
/// use enkf_optimizer::EnkfConfig;
///
/// let config = EnkfConfig::default()
///     .pop_size(16)
///     .n_iteration(50)
///     .observations(vec![1.0])
///     .sample(true)
///     .pick_method("best_first");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EnkfConfig {
    /// Scale of the observation-noise matrix `gamma * I`.
    ///
    /// `0.0` means no observation noise; the update then fails with
    /// [`Error::NumericalInstability`] whenever the model outputs are
    /// (near) collinear.
    pub gamma: f64,
    /// Kalman sweeps per generation.
    pub maxit: usize,
    /// Ensemble size.
    pub pop_size: usize,
    /// Seed for every stochastic choice of the optimizer.
    pub seed: u64,
    /// Generation budget.
    pub n_iteration: usize,
    /// Fitness at or above which the run stops early.
    pub stop_criterion: f64,
    /// Whether to run elitist resampling before each update.
    pub sample: bool,
    /// Elite fraction.
    pub best_n: f64,
    /// Replaced fraction.
    pub worst_n: f64,
    /// Name of the resampling method.
    pub pick_method: String,
    /// Method-specific parameters.
    pub kwargs: PolicyKwargs,
    /// Target observation vector.
    pub observations: Vec<f64>,
}

impl Default for EnkfConfig {
    fn default() -> Self {
        Self {
            gamma: 0.01,
            maxit: 1,
            pop_size: 10,
            seed: 0,
            n_iteration: 10,
            stop_criterion: f64::INFINITY,
            sample: false,
            best_n: 0.25,
            worst_n: 0.25,
            pick_method: "random".to_owned(),
            kwargs: PolicyKwargs::default(),
            observations: Vec::new(),
        }
    }
}

macro_rules! setter {
    ($(#[$doc:meta] $name:ident: $ty:ty),* $(,)?) => {
        $(
            #[$doc]
            #[must_use]
            pub fn $name(mut self, $name: $ty) -> Self {
                self.$name = $name;
                self
            }
        )*
    };
}

impl EnkfConfig {
    setter! {
        /// Sets [`gamma`](Self::gamma).
        gamma: f64,
        /// Sets [`maxit`](Self::maxit).
        maxit: usize,
        /// Sets [`pop_size`](Self::pop_size).
        pop_size: usize,
        /// Sets [`seed`](Self::seed).
        seed: u64,
        /// Sets [`n_iteration`](Self::n_iteration).
        n_iteration: usize,
        /// Sets [`stop_criterion`](Self::stop_criterion).
        stop_criterion: f64,
        /// Sets [`sample`](Self::sample).
        sample: bool,
        /// Sets [`best_n`](Self::best_n).
        best_n: f64,
        /// Sets [`worst_n`](Self::worst_n).
        worst_n: f64,
        /// Sets [`kwargs`](Self::kwargs).
        kwargs: PolicyKwargs,
        /// Sets [`observations`](Self::observations).
        observations: Vec<f64>,
    }

    /// Sets [`pick_method`](Self::pick_method).
    #[must_use]
    pub fn pick_method(mut self, pick_method: impl Into<String>) -> Self {
        self.pick_method = pick_method.into();
        self
    }

    /// Checks every option.
    ///
    /// The pick method name is checked even when sampling is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] describing the first invalid option.
    pub fn validate(&self) -> Result<()> {
        if self.pop_size == 0 {
            return Err(Error::config("pop_size must be at least 1"));
        }
        if self.n_iteration == 0 {
            return Err(Error::config("n_iteration must be at least 1"));
        }
        if !self.gamma.is_finite() || self.gamma < 0.0 {
            return Err(Error::config(format!(
                "gamma must be finite and non-negative, got {}",
                self.gamma
            )));
        }
        if self.stop_criterion.is_nan() {
            return Err(Error::config("stop_criterion must not be NaN"));
        }
        if self.observations.is_empty() {
            return Err(Error::config("observations must not be empty"));
        }
        if self.observations.iter().any(|v| !v.is_finite()) {
            return Err(Error::config("observations must be finite"));
        }
        self.build_policy().map(|_| ())
    }

    /// The resampling policy, or `None` when `sample` is off.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an unknown `pick_method`,
    /// invalid kwargs, or fractions outside `[0, 1]`.
    pub fn sampling_policy(&self) -> Result<Option<SamplingPolicy>> {
        let policy = self.build_policy()?;
        Ok(self.sample.then_some(policy))
    }

    fn build_policy(&self) -> Result<SamplingPolicy> {
        let method = PickMethod::from_name(&self.pick_method, &self.kwargs)?;
        SamplingPolicy::new(self.best_n, self.worst_n, method)
    }

    /// Parses a JSON configuration; missing options take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the JSON is malformed.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::config(e.to_string()))
    }
}
