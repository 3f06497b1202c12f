//! Simulation Error Types
//!
//! Errors raised by connectivity generation, sparseness tuning, and the
//! pipeline driver.

use olfsysm_core::CoreError;
use thiserror::Error;

/// Simulation error type
#[derive(Error, Debug)]
pub enum SimError {
    /// Error from the data model
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Connectivity draw weights cannot form a distribution
    #[error("invalid connectivity weights: {0}")]
    InvalidConnectivityWeights(String),

    /// No odors available to tune against
    #[error("sparseness tuning needs at least one odor")]
    EmptyTuningSet,

    /// A tuning odor index is past the end of the odor set
    #[error("tuning odor {odor} out of range ({n_odors} odors)")]
    TuningOdorOutOfRange {
        /// Offending index
        odor: usize,
        /// Number of odors
        n_odors: usize,
    },

    /// PN noise parameters cannot form a normal distribution
    #[error("invalid PN noise: {0}")]
    InvalidNoise(String),

    /// Worker pool could not be built
    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

/// Result type for simulation operations
pub type SimResult<T> = Result<T, SimError>;
