//! Elitist resampling applied to the ensemble before the Kalman update.
//!
//! Members are ranked by fitness (best first). The bottom `worst_n`
//! fraction is then overwritten with information taken from the top
//! `best_n` fraction, using one of the [`PickMethod`] strategies:
//!
//! | Method | Replacement |
//! |--------|-------------|
//! | [`Random`](PickMethod::Random) | Noisy copy of a uniformly chosen elite member |
//! | [`BestFirst`](PickMethod::BestFirst) | Noisy copy of the first elite member accepted with `pick_probability` |
//! | [`Gaussian`](PickMethod::Gaussian) | Draws from a multivariate normal fitted to the elite |
//! | [`RvHistogram`](PickMethod::RvHistogram) | Draws from per-feature histograms of the elite |
//!
//! Replacements always read from the input snapshot, so the elite and
//! worst groups may overlap (`best_n + worst_n > 1`). When either group
//! rounds down to zero members the step is a no-op.
//!
//! # Examples
//!
//! ```
//! use enkf_optimizer::kalman::ModelOutput;
//! use enkf_optimizer::sampling::{PickMethod, SamplingPolicy};
//! use nalgebra::DMatrix;
//!
//! let policy = SamplingPolicy::new(0.25, 0.25, PickMethod::Random { loc: 0.0, scale: 0.0 }).unwrap();
//! let ensemble = DMatrix::from_row_slice(4, 1, &[1.0, 2.0, 3.0, 4.0]);
//! let fitness = [1.0, 2.0, 3.0, 4.0];
//! let outputs = ModelOutput::from_fitness(&fitness.map(|f| vec![f]), 1).unwrap();
//!
//! let mut rng = fastrand::Rng::with_seed(0);
//! let (next, _) = policy.apply(&ensemble, &outputs, &fitness, &mut rng).unwrap();
//! // The worst member (fitness 1) became a copy of the best one.
//! assert_eq!(next[(0, 0)], 4.0);
//! ```

mod best_first;
mod gaussian;
mod histogram;
mod random;

use core::cmp::Ordering;
use core::str::FromStr;

use nalgebra::DMatrix;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::kalman::ModelOutput;
use crate::rng_util;

/// Names accepted by [`PickMethod::from_name`].
pub const PICK_METHODS: [&str; 4] = ["random", "best_first", "gaussian", "rv_histogram"];

/// Policy-specific parameters, as they appear in a run configuration.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PolicyKwargs {
    /// Acceptance probability per elite candidate (`best_first`).
    pub pick_probability: f64,
    /// Mean of the perturbation noise (`random`, `best_first`).
    pub loc: f64,
    /// Standard deviation of the perturbation noise (`random`, `best_first`).
    pub scale: f64,
    /// Number of histogram bins per feature (`rv_histogram`).
    pub bins: usize,
}

impl Default for PolicyKwargs {
    fn default() -> Self {
        Self {
            pick_probability: 0.5,
            loc: 0.0,
            scale: 0.1,
            bins: 10,
        }
    }
}

/// How the worst members are replaced.
#[derive(Clone, Debug, PartialEq)]
pub enum PickMethod {
    /// Copy a uniformly random elite member and add `N(loc, scale)` noise.
    Random {
        /// Noise mean.
        loc: f64,
        /// Noise standard deviation.
        scale: f64,
    },
    /// Scan the elite in rank order, accepting each with `pick_probability`.
    BestFirst {
        /// Acceptance probability per candidate.
        pick_probability: f64,
        /// Noise mean.
        loc: f64,
        /// Noise standard deviation.
        scale: f64,
    },
    /// Sample from a multivariate normal fitted to the elite.
    Gaussian,
    /// Sample each feature from a histogram of the elite's values.
    RvHistogram {
        /// Number of equal-width bins.
        bins: usize,
    },
}

impl PickMethod {
    /// Builds a method from its configuration name and keyword arguments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for an unknown name or invalid kwargs.
    ///
    /// # Examples
    ///
    /// ```
    /// use enkf_optimizer::sampling::{PickMethod, PolicyKwargs};
    ///
    /// let m = PickMethod::from_name("gaussian", &PolicyKwargs::default()).unwrap();
    /// assert_eq!(m, PickMethod::Gaussian);
    /// assert!(PickMethod::from_name("roulette", &PolicyKwargs::default()).is_err());
    /// ```
    pub fn from_name(name: &str, kwargs: &PolicyKwargs) -> Result<Self> {
        let method = match name {
            "random" => PickMethod::Random {
                loc: kwargs.loc,
                scale: kwargs.scale,
            },
            "best_first" => PickMethod::BestFirst {
                pick_probability: kwargs.pick_probability,
                loc: kwargs.loc,
                scale: kwargs.scale,
            },
            "gaussian" => PickMethod::Gaussian,
            "rv_histogram" => PickMethod::RvHistogram { bins: kwargs.bins },
            other => {
                return Err(Error::config(format!(
                    "unknown pick_method '{other}', expected one of {PICK_METHODS:?}"
                )));
            }
        };
        method.validate()?;
        Ok(method)
    }

    /// The configuration name of this method.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            PickMethod::Random { .. } => "random",
            PickMethod::BestFirst { .. } => "best_first",
            PickMethod::Gaussian => "gaussian",
            PickMethod::RvHistogram { .. } => "rv_histogram",
        }
    }

    fn validate(&self) -> Result<()> {
        match *self {
            PickMethod::Random { loc, scale } | PickMethod::BestFirst { loc, scale, .. }
                if !loc.is_finite() || !scale.is_finite() || scale < 0.0 =>
            {
                Err(Error::config(format!(
                    "noise needs finite loc and scale >= 0, got loc = {loc}, scale = {scale}"
                )))
            }
            PickMethod::BestFirst {
                pick_probability, ..
            } if !(0.0..=1.0).contains(&pick_probability) => Err(Error::config(format!(
                "pick_probability must be in [0, 1], got {pick_probability}"
            ))),
            PickMethod::RvHistogram { bins: 0 } => {
                Err(Error::config("rv_histogram needs at least one bin"))
            }
            _ => Ok(()),
        }
    }
}

impl FromStr for PickMethod {
    type Err = Error;

    /// Parses a name using default [`PolicyKwargs`].
    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s, &PolicyKwargs::default())
    }
}

/// Member indices of the elite and worst groups, each in rank order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ranking {
    /// Indices of the best members, best first.
    pub best: Vec<usize>,
    /// Indices of the worst members, in rank order (the very worst last).
    pub worst: Vec<usize>,
}

/// Ranks `fitness` descending (NaN last) and cuts both groups.
///
/// Group sizes are `floor(fraction * fitness.len())`.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn rank(fitness: &[f64], best_n: f64, worst_n: f64) -> Ranking {
    let n = fitness.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| descending(fitness[a], fitness[b]));

    let n_best = ((best_n * n as f64).floor() as usize).min(n);
    let n_worst = ((worst_n * n as f64).floor() as usize).min(n);

    Ranking {
        best: order[..n_best].to_vec(),
        worst: order[n - n_worst..].to_vec(),
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}

/// Elitist replacement step: fractions plus the replacement strategy.
#[derive(Clone, Debug, PartialEq)]
pub struct SamplingPolicy {
    best_n: f64,
    worst_n: f64,
    method: PickMethod,
}

impl SamplingPolicy {
    /// Creates a policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a fraction lies outside `[0, 1]`
    /// or the method's parameters are invalid.
    pub fn new(best_n: f64, worst_n: f64, method: PickMethod) -> Result<Self> {
        for (name, value) in [("best_n", best_n), ("worst_n", worst_n)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::config(format!(
                    "{name} must be a fraction in [0, 1], got {value}"
                )));
            }
        }
        method.validate()?;
        Ok(Self {
            best_n,
            worst_n,
            method,
        })
    }

    /// Fraction of members treated as elite.
    #[must_use]
    pub fn best_n(&self) -> f64 {
        self.best_n
    }

    /// Fraction of members replaced.
    #[must_use]
    pub fn worst_n(&self) -> f64 {
        self.worst_n
    }

    /// The replacement strategy.
    #[must_use]
    pub fn method(&self) -> &PickMethod {
        &self.method
    }

    /// Returns the resampled `(ensemble, model_output)` pair.
    ///
    /// Inputs are left untouched; the outputs have identical shapes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `fitness`, the ensemble rows
    /// and the model-output members disagree in count.
    pub fn apply(
        &self,
        ensemble: &DMatrix<f64>,
        model_output: &ModelOutput,
        fitness: &[f64],
        rng: &mut fastrand::Rng,
    ) -> Result<(DMatrix<f64>, ModelOutput)> {
        if fitness.len() != ensemble.nrows() {
            return Err(Error::DimensionMismatch {
                context: "fitness vs ensemble rows",
                expected: ensemble.nrows(),
                got: fitness.len(),
            });
        }
        if model_output.pop_size() != ensemble.nrows() {
            return Err(Error::DimensionMismatch {
                context: "model output members vs ensemble rows",
                expected: ensemble.nrows(),
                got: model_output.pop_size(),
            });
        }

        let ranking = rank(fitness, self.best_n, self.worst_n);
        if ranking.best.is_empty() || ranking.worst.is_empty() {
            trace_debug!(
                n_best = ranking.best.len(),
                n_worst = ranking.worst.len(),
                "resampling skipped: empty elite or worst group"
            );
            return Ok((ensemble.clone(), model_output.clone()));
        }

        let replaced = match self.method {
            PickMethod::Random { loc, scale } => {
                random::replace(ensemble, model_output, &ranking, loc, scale, rng)
            }
            PickMethod::BestFirst {
                pick_probability,
                loc,
                scale,
            } => best_first::replace(
                ensemble,
                model_output,
                &ranking,
                pick_probability,
                (loc, scale),
                rng,
            ),
            PickMethod::Gaussian => gaussian::replace(ensemble, model_output, &ranking, rng),
            PickMethod::RvHistogram { bins } => {
                histogram::replace(ensemble, model_output, &ranking, bins, rng)
            }
        };

        trace_debug!(
            method = self.method.name(),
            n_best = ranking.best.len(),
            n_worst = ranking.worst.len(),
            "resampling applied"
        );
        Ok(replaced)
    }
}

/// Writes `source[src] + N(loc, scale)` into row `dst` of `target`.
fn perturbed_copy(
    target: &mut DMatrix<f64>,
    source: &DMatrix<f64>,
    dst: usize,
    src: usize,
    (loc, scale): (f64, f64),
    rng: &mut fastrand::Rng,
) {
    for j in 0..source.ncols() {
        target[(dst, j)] = source[(src, j)] + rng_util::normal(rng, loc, scale);
    }
}

/// Fills the model-output rows of `slots` from randomly re-picked elite members.
fn repick_outputs(
    model_output: &ModelOutput,
    slots: &[usize],
    best: &[usize],
    rng: &mut fastrand::Rng,
) -> ModelOutput {
    let mut next = model_output.clone();
    for &slot in slots {
        let pick = best[rng.usize(0..best.len())];
        next.copy_row_from(slot, model_output, pick);
    }
    next
}
