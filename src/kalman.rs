//! Ensemble Kalman Filter update engine.
//!
//! Follows the inverse-problem formulation of Iglesias, Law & Stuart (2013),
//! *Ensemble Kalman methods for inverse problems*. For every depth slice of
//! the model output the engine estimates
//!
//! - `Cpp`, the covariance of the model output with itself, and
//! - `Cup`, the cross-covariance of parameters and model output,
//!
//! and moves every member by `K · (y − G(u))` with gain
//! `K = Cup · (Cpp + Γ)⁻¹`.
//!
//! # Examples
//!
//! ```
//! use enkf_optimizer::kalman::{EnsembleKalmanFilter, ModelOutput, noise_matrix};
//! use nalgebra::DMatrix;
//!
//! let ensemble = DMatrix::from_row_slice(3, 1, &[0.0, 1.0, 2.0]);
//! let outputs = ModelOutput::from_fitness(&[vec![0.0], vec![1.0], vec![2.0]], 1).unwrap();
//!
//! let mut enkf = EnsembleKalmanFilter::new(1);
//! let updated = enkf
//!     .fit(&ensemble, &[3.0], &outputs, &noise_matrix(0.1, 1))
//!     .unwrap();
//! // Every member moves toward the target.
//! assert!(updated[(0, 0)] > 0.0);
//! ```

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};

/// Reciprocal condition number below which `Cpp + Γ` counts as singular.
pub const RCOND_THRESHOLD: f64 = 1e-12;

/// Per-member model output, shaped `(pop_size, n_observations, depth)`.
///
/// Stored row-major: element `(i, j, d)` lives at
/// `i * n_observations * depth + j * depth + d`.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelOutput {
    pop_size: usize,
    n_observations: usize,
    depth: usize,
    data: Vec<f64>,
}

impl ModelOutput {
    /// Wraps a row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `data` does not hold exactly
    /// `pop_size * n_observations * depth` values.
    pub fn new(
        pop_size: usize,
        n_observations: usize,
        depth: usize,
        data: Vec<f64>,
    ) -> Result<Self> {
        let expected = pop_size * n_observations * depth;
        if data.len() != expected {
            return Err(Error::DimensionMismatch {
                context: "model output buffer",
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            pop_size,
            n_observations,
            depth,
            data,
        })
    }

    /// Reshapes raw per-member fitness into `(pop_size, n_observations, -1)`.
    ///
    /// Every member must report the same number of values, and that number
    /// must be a non-zero multiple of `n_observations`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if the fitness cannot be reshaped.
    pub fn from_fitness(fitness: &[Vec<f64>], n_observations: usize) -> Result<Self> {
        let per_member = fitness.first().map_or(0, Vec::len);
        if let Some(bad) = fitness.iter().find(|f| f.len() != per_member) {
            return Err(Error::DimensionMismatch {
                context: "fitness values per member",
                expected: per_member,
                got: bad.len(),
            });
        }
        if n_observations == 0 || per_member == 0 || per_member % n_observations != 0 {
            return Err(Error::DimensionMismatch {
                context: "fitness values per member (multiple of the observation count)",
                expected: n_observations,
                got: per_member,
            });
        }
        let data = fitness.iter().flatten().copied().collect();
        Self::new(
            fitness.len(),
            n_observations,
            per_member / n_observations,
            data,
        )
    }

    /// Number of ensemble members.
    #[must_use]
    pub fn pop_size(&self) -> usize {
        self.pop_size
    }

    /// Length of the observation vector (`k`).
    #[must_use]
    pub fn n_observations(&self) -> usize {
        self.n_observations
    }

    /// Number of repeats per observation (`r`).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Element `(member, observation, depth)`.
    #[must_use]
    pub fn get(&self, member: usize, observation: usize, depth: usize) -> f64 {
        self.data[self.index(member, observation, depth)]
    }

    /// All `k * r` values of one member.
    #[must_use]
    pub fn row(&self, member: usize) -> &[f64] {
        let width = self.n_observations * self.depth;
        &self.data[member * width..(member + 1) * width]
    }

    /// The `(pop_size × k)` matrix for one depth slice.
    #[must_use]
    pub fn slice(&self, depth: usize) -> DMatrix<f64> {
        DMatrix::from_fn(self.pop_size, self.n_observations, |i, j| {
            self.get(i, j, depth)
        })
    }

    /// Overwrites member `dst` with member `src` of `source`.
    pub(crate) fn copy_row_from(&mut self, dst: usize, source: &ModelOutput, src: usize) {
        let width = self.n_observations * self.depth;
        self.data[dst * width..(dst + 1) * width].copy_from_slice(source.row(src));
    }

    fn index(&self, member: usize, observation: usize, depth: usize) -> usize {
        (member * self.n_observations + observation) * self.depth + depth
    }
}

/// Builds the observation-noise matrix `Γ = γ · I(k)`.
///
/// A scalar of exactly `0.0` yields the identity: the filter then runs with
/// unit observation noise instead of an unregularised (and usually singular)
/// `Cpp`.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn noise_matrix(gamma: f64, n_observations: usize) -> DMatrix<f64> {
    let identity = DMatrix::identity(n_observations, n_observations);
    if gamma == 0.0 {
        identity
    } else {
        identity * gamma
    }
}

/// Cross-covariance of the columns of `x` and `y` across the member axis.
///
/// Rows of `x` and `y` are ensemble members. Centring uses per-column means,
/// except for a single member, where the scalar mean of the whole matrix is
/// used. The sum is divided by `ensemble_size` (not `ensemble_size - 1`).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn covariance(x: &DMatrix<f64>, y: &DMatrix<f64>, ensemble_size: usize) -> DMatrix<f64> {
    let xc = center(x);
    let yc = center(y);
    xc.transpose() * yc / ensemble_size.max(1) as f64
}

fn center(m: &DMatrix<f64>) -> DMatrix<f64> {
    if m.nrows() == 1 {
        let mean = m.mean();
        m.map(|v| v - mean)
    } else {
        let means = m.row_mean();
        DMatrix::from_fn(m.nrows(), m.ncols(), |i, j| m[(i, j)] - means[j])
    }
}

/// Stateless-between-calls EnKF engine with inspectable last-call state.
#[derive(Clone, Debug)]
pub struct EnsembleKalmanFilter {
    maxit: usize,
    gamma: DMatrix<f64>,
    gamma_shape: usize,
    dims: usize,
    ensemble: Option<DMatrix<f64>>,
    observations: Option<DVector<f64>>,
    cpp: Option<DMatrix<f64>>,
    cup: Option<DMatrix<f64>>,
}

impl EnsembleKalmanFilter {
    /// Creates an engine running `maxit` sweeps over the depth slices per fit.
    #[must_use]
    pub fn new(maxit: usize) -> Self {
        Self {
            maxit,
            gamma: DMatrix::zeros(0, 0),
            gamma_shape: 0,
            dims: 0,
            ensemble: None,
            observations: None,
            cpp: None,
            cup: None,
        }
    }

    /// Runs the prediction/update step and returns the updated ensemble.
    ///
    /// `ensemble` is `pop_size × d`, `observations` has length `k`,
    /// `model_output` is `(pop_size, k, r)` and `gamma` is `k × k`.
    ///
    /// # Errors
    ///
    /// - [`Error::DimensionMismatch`] if the inputs disagree in shape.
    /// - [`Error::NumericalInstability`] if `Cpp + gamma` cannot be inverted.
    pub fn fit(
        &mut self,
        ensemble: &DMatrix<f64>,
        observations: &[f64],
        model_output: &ModelOutput,
        gamma: &DMatrix<f64>,
    ) -> Result<&DMatrix<f64>> {
        let ensemble_size = ensemble.nrows();
        let k = model_output.n_observations();
        check(
            "model output members vs ensemble rows",
            ensemble_size,
            model_output.pop_size(),
        )?;
        check("observations vs model output", k, observations.len())?;
        check("gamma rows", k, gamma.nrows())?;
        check("gamma columns", k, gamma.ncols())?;

        self.gamma_shape = k;
        self.dims = observations.len();
        self.gamma = gamma.clone();
        let observations = DVector::from_column_slice(observations);

        let mut current = ensemble.clone();
        for _ in 0..self.maxit {
            for d in 0..model_output.depth() {
                let mo = model_output.slice(d);
                let cpp = covariance(&mo, &mo, ensemble_size);
                let cup = covariance(&current, &mo, ensemble_size);
                current = update_step(&current, &observations, &mo, gamma, &cpp, &cup)?;
                self.cpp = Some(cpp);
                self.cup = Some(cup);
            }
        }

        self.observations = Some(observations);
        Ok(&*self.ensemble.insert(current))
    }

    /// Inner iteration count.
    #[must_use]
    pub fn maxit(&self) -> usize {
        self.maxit
    }

    /// Noise matrix used by the last fit.
    #[must_use]
    pub fn gamma(&self) -> &DMatrix<f64> {
        &self.gamma
    }

    /// Side length of the noise matrix used by the last fit.
    #[must_use]
    pub fn gamma_shape(&self) -> usize {
        self.gamma_shape
    }

    /// Number of observations seen by the last fit.
    #[must_use]
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Ensemble produced by the last fit.
    #[must_use]
    pub fn ensemble(&self) -> Option<&DMatrix<f64>> {
        self.ensemble.as_ref()
    }

    /// Observations of the last fit.
    #[must_use]
    pub fn observations(&self) -> Option<&DVector<f64>> {
        self.observations.as_ref()
    }

    /// Last model-output covariance.
    #[must_use]
    pub fn cpp(&self) -> Option<&DMatrix<f64>> {
        self.cpp.as_ref()
    }

    /// Last parameter/model-output cross-covariance.
    #[must_use]
    pub fn cup(&self) -> Option<&DMatrix<f64>> {
        self.cup.as_ref()
    }
}

fn check(context: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected == got {
        Ok(())
    } else {
        Err(Error::DimensionMismatch {
            context,
            expected,
            got,
        })
    }
}

fn update_step(
    ensemble: &DMatrix<f64>,
    observations: &DVector<f64>,
    g: &DMatrix<f64>,
    gamma: &DMatrix<f64>,
    cpp: &DMatrix<f64>,
    cup: &DMatrix<f64>,
) -> Result<DMatrix<f64>> {
    let cpg_inv = invert(cpp + gamma)?;
    let residual = DMatrix::from_fn(g.nrows(), g.ncols(), |i, j| observations[j] - g[(i, j)]);
    Ok(ensemble + (cup * cpg_inv * residual.transpose()).transpose())
}

/// Inverts `m`, refusing singular or badly conditioned input.
fn invert(m: DMatrix<f64>) -> Result<DMatrix<f64>> {
    let sym = (&m + m.transpose()) * 0.5;
    let eigenvalues = sym.symmetric_eigenvalues();
    let max = eigenvalues.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let min = eigenvalues
        .iter()
        .fold(f64::INFINITY, |acc, v| acc.min(v.abs()));
    let rcond = if max > 0.0 { min / max } else { 0.0 };
    if rcond.is_nan() || rcond < RCOND_THRESHOLD {
        return Err(Error::NumericalInstability { rcond });
    }
    m.try_inverse()
        .ok_or(Error::NumericalInstability { rcond })
}
