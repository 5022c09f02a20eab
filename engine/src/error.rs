//! Error handling for the optibench engine
//!
//! Failures inside a single trial are recoverable (the trial is dropped from
//! aggregation); a run in which no trial succeeds is a hard failure that is
//! surfaced to the caller and never turned into a zero-filled metrics record.

use thiserror::Error;

/// The main error type for benchmark operations
#[derive(Error, Debug)]
pub enum BenchError {
    /// One query attempt failed; recovered locally by excluding the trial
    #[error("Trial execution failed: {reason}")]
    TrialExecution { reason: String },

    /// Every timed trial of a run failed
    #[error("No successful trials out of {attempted} attempted")]
    NoSuccessfulTrials { attempted: u32 },

    /// The backend inventory could not provide a size; downgrades to absent
    #[error("Model size unavailable for {model}: {reason}")]
    SizeResolutionUnavailable { model: String, reason: String },

    /// Synthetic reduction ratio outside [0, 1]
    #[error("Invalid reduction ratio {0}: must be within [0, 1]")]
    InvalidRatio(f64),

    #[error("Unknown quantization level: {0}")]
    UnknownQuantizationLevel(String),

    #[error("Iteration count must be greater than 0")]
    InvalidIterations,

    /// Process resource readings are not supported on this platform
    #[error("Resource probe unavailable: {0}")]
    ProbeUnavailable(String),

    /// Metrics registry errors
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

impl BenchError {
    pub fn trial<E: std::fmt::Display>(err: E) -> Self {
        BenchError::TrialExecution {
            reason: err.to_string(),
        }
    }

    /// Whether the error only affects a single trial and can be absorbed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BenchError::TrialExecution { .. } | BenchError::SizeResolutionUnavailable { .. }
        )
    }
}

/// Result type alias for benchmark operations
pub type Result<T> = std::result::Result<T, BenchError>;
