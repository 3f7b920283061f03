//! Error types for quality scoring.

use crate::weights::WeightError;

/// Errors raised while building scoring inputs.
///
/// Scoring itself never fails: out-of-range values are clamped and missing
/// values default to neutral. Only structurally unusable inputs are rejected.
#[derive(Debug, thiserror::Error)]
pub enum QualityError {
    /// The oracle payload was not a JSON object
    #[error("Metric payload must be a JSON object, got {0}")]
    NotAnObject(String),

    /// Invalid weight table
    #[error("Invalid weights: {0}")]
    Weights(#[from] WeightError),
}

pub type Result<T> = std::result::Result<T, QualityError>;
