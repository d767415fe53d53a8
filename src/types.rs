//! Core record types for an optimization run.

use nalgebra::DMatrix;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where a run is in its lifecycle.
///
/// A freshly built optimizer is already waiting for the fitness of
/// generation 0; the update phase happens entirely inside
/// [`tell`](crate::EnkfOptimizer::tell).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RunState {
    /// The population of `generation` is out for evaluation.
    AwaitingFitness {
        /// Index of the generation awaiting fitness.
        generation: usize,
    },
    /// A stop condition fired; no further fitness is accepted.
    Terminated,
}

/// The best individual seen so far in a run.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BestIndividual {
    /// Generation in which it was evaluated.
    pub generation: usize,
    /// Its slot within that generation.
    pub individual: usize,
    /// Its fitness.
    pub fitness: f64,
}

impl BestIndividual {
    /// The record before any fitness has been observed.
    #[must_use]
    pub fn initial() -> Self {
        Self {
            generation: 0,
            individual: 0,
            fitness: f64::NEG_INFINITY,
        }
    }
}

impl Default for BestIndividual {
    fn default() -> Self {
        Self::initial()
    }
}

/// Ensemble weights produced by the Kalman update of one generation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GenerationRecord {
    /// Generation index.
    pub generation: usize,
    /// One row of flat parameters per ensemble member.
    pub weights: Vec<Vec<f64>>,
}

impl GenerationRecord {
    /// Captures the rows of `ensemble`.
    #[must_use]
    pub fn new(generation: usize, ensemble: &DMatrix<f64>) -> Self {
        Self {
            generation,
            weights: ensemble
                .row_iter()
                .map(|row| row.iter().copied().collect())
                .collect(),
        }
    }

    /// `(members, parameters)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.weights.len(), self.weights.first().map_or(0, Vec::len))
    }

    /// Rebuilds the ensemble matrix.
    #[must_use]
    pub fn to_matrix(&self) -> DMatrix<f64> {
        let (rows, cols) = self.shape();
        DMatrix::from_row_iterator(rows, cols, self.weights.iter().flatten().copied())
    }
}

/// Final record of a terminated run.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunResult {
    /// Where and how well the best individual scored.
    pub best: BestIndividual,
    /// Parameters of the best individual as they were evaluated.
    pub individual: Option<crate::Individual>,
    /// Number of generations whose fitness was processed.
    pub generations: usize,
}

/// Outcome of feeding one generation's fitness to the optimizer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Step {
    /// A new population for `generation` is ready to be evaluated.
    Continue {
        /// Index of the new generation.
        generation: usize,
    },
    /// The run ended; carries the final best record.
    Terminated(BestIndividual),
}
