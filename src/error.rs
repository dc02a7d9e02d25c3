//! Error types for the collapse simulation.

use thiserror::Error;

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimulationError>;

/// Errors that can occur while configuring or running a simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// Amplitude vector shorter than two outcome branches.
    #[error("amplitude vector must contain at least 2 entries, got {0}")]
    AmplitudeCount(usize),

    /// Amplitude vector with zero norm cannot be normalized.
    #[error("amplitude vector has zero norm")]
    ZeroNormAmplitudes,

    /// Apparatus Hilbert dimension too small for Beta(1, d-1) sampling.
    #[error("apparatus dimension must be at least 2, got {0}")]
    ApparatusDimension(usize),

    /// Measured system must have at least two outcome branches.
    #[error("system dimension must be at least 2, got {0}")]
    SystemDimension(usize),

    /// A rate, threshold, or step parameter outside its valid range.
    #[error("{name} must be positive, got {value}")]
    NonPositiveParameter { name: &'static str, value: f64 },

    /// A parameter that must not be negative.
    #[error("{name} must be non-negative, got {value}")]
    NegativeParameter { name: &'static str, value: f64 },

    /// Overlaps requested before the microstate was sampled.
    #[error("apparatus microstate has not been sampled yet")]
    MicrostateNotSampled,

    /// More pointer states requested than the apparatus dimension holds.
    #[error("pointer basis needs {needed} orthonormal states but apparatus dimension is {dim}")]
    PointerBasisTooLarge { needed: usize, dim: usize },

    /// Mismatched vector or operator dimensions.
    #[error("dimension mismatch: {context}")]
    DimensionMismatch { context: &'static str },

    /// Non-finite input outside of time evolution.
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),

    /// NaN or Inf appeared during time evolution. Fatal for the trial.
    #[error("non-finite value in {context} at t = {t}")]
    NumericalInstability { context: &'static str, t: f64 },

    /// A trial aborted the ensemble under the strict failure policy.
    #[error("trial {trial} failed: {source}")]
    TrialFailed {
        trial: usize,
        #[source]
        source: Box<SimulationError>,
    },

    /// Ensemble invoked with zero trials.
    #[error("ensemble requires at least one trial")]
    EmptyEnsemble,

    /// Failure inside a statistics routine (degenerate distribution parameters).
    #[error("statistics error: {0}")]
    Statistics(String),
}
