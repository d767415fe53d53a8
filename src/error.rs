/// Errors surfaced by the optimizer core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the run configuration is invalid, e.g. an unknown
    /// `pick_method` or a fraction outside `[0, 1]`.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Returned when two pieces of data that must agree in size do not.
    #[error("dimension mismatch in {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        /// What was being checked.
        context: &'static str,
        /// The expected size.
        expected: usize,
        /// The size actually found.
        got: usize,
    },

    /// Returned when an individual does not conform to the captured schema.
    #[error("schema mismatch for field '{field}': {reason}")]
    SchemaMismatch {
        /// The offending field name.
        field: String,
        /// Why the field does not conform.
        reason: String,
    },

    /// Returned when `Cpp + gamma` is singular or too badly conditioned to invert.
    #[error("numerical instability: Cpp + gamma is not invertible (rcond = {rcond:e})")]
    NumericalInstability {
        /// Reciprocal condition number estimate of the matrix.
        rcond: f64,
    },

    /// Returned when a member reports a NaN or infinite fitness value.
    #[error("member {member} reported a non-finite fitness value")]
    NonFiniteFitness {
        /// Slot of the offending member.
        member: usize,
    },

    /// Returned when fitness is supplied after the run has terminated.
    #[error("the optimization run has already terminated")]
    Terminated,

    /// Returned when a storage operation fails.
    #[cfg(feature = "journal")]
    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub(crate) fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::SchemaMismatch {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
