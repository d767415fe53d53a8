#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Ensemble Kalman Filter optimization of black-box objectives.
//!
//! A population of candidate parameter sets (the ensemble) is evolved by
//! repeated Kalman-style correction steps: members whose model outputs are
//! far from a target observation vector are pulled toward the region that
//! explains it. Fitness is maximised. An optional elitist resampling step
//! replaces the worst members with perturbed copies of the best ones before
//! each update.
//!
//! # Getting Started
//!
//! ```
//! use enkf_optimizer::prelude::*;
//!
//! let config = EnkfConfig::default()
//!     .pop_size(10)
//!     .n_iteration(20)
//!     .observations(vec![0.0])
//!     .seed(42);
//!
//! let mut rng = fastrand::Rng::with_seed(7);
//! let mut opt = EnkfOptimizer::builder(config)
//!     .build(|| Individual::new().with("x", vec![rng.f64() * 4.0 - 2.0, rng.f64() * 4.0 - 2.0]))
//!     .unwrap();
//!
//! let result = opt
//!     .optimize(|population| {
//!         Ok::<_, Error>(
//!             population
//!                 .iter()
//!                 .map(|ind| -ind.get("x").unwrap().as_slice().iter().map(|v| v * v).sum::<f64>())
//!                 .collect(),
//!         )
//!     })
//!     .unwrap();
//!
//! assert_eq!(result.generations, 20);
//! assert!(result.best.fitness <= 0.0);
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`EnkfOptimizer`] | Drive a run: hand out populations, take fitness, track the best. |
//! | [`EnkfConfig`] | All run options with defaults and fluent setters. |
//! | [`Individual`] | One candidate: named scalar or array parameters. |
//! | [`Schema`](codec::Schema) | Fixed layout mapping an individual to a flat vector. |
//! | [`EnsembleKalmanFilter`](kalman::EnsembleKalmanFilter) | The update engine. |
//! | [`SamplingPolicy`](sampling::SamplingPolicy) | Elitist replacement of the worst members. |
//! | [`RecordStorage`](storage::RecordStorage) | Sink for per-generation ensemble weights. |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `serde` | `Serialize`/`Deserialize` on configuration and records, [`EnkfConfig::from_json`] | off |
//! | `journal` | [`JournalStorage`](storage::JournalStorage): JSONL persistence with file locking (enables `serde`) | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at each generation | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

pub mod codec;
mod config;
mod error;
pub mod kalman;
mod optimizer;
mod param;
mod rng_util;
pub mod sampling;
pub mod storage;
mod types;

pub use config::EnkfConfig;
pub use error::{Error, Result};
pub use optimizer::{BoundingFn, EnkfOptimizer, EnkfOptimizerBuilder, GenerationSnapshot};
pub use param::{Individual, ParamValue};
pub use types::{BestIndividual, GenerationRecord, RunResult, RunState, Step};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use enkf_optimizer::prelude::*;
/// ```
pub mod prelude {
    pub use crate::codec::Schema;
    pub use crate::config::EnkfConfig;
    pub use crate::error::{Error, Result};
    pub use crate::optimizer::{EnkfOptimizer, EnkfOptimizerBuilder};
    pub use crate::param::{Individual, ParamValue};
    pub use crate::sampling::{PickMethod, PolicyKwargs};
    #[cfg(feature = "journal")]
    pub use crate::storage::JournalStorage;
    pub use crate::storage::{MemoryStorage, RecordStorage};
    pub use crate::types::{BestIndividual, GenerationRecord, RunResult, RunState, Step};
}
