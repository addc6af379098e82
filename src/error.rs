//! Error types for gait geometry operations.
//!
//! Errors fall into four classes: parse failures, insufficient data,
//! numerical failures on the SPD manifold, and configuration problems.
//! Callers use [`GaitError::is_numerical`] and
//! [`GaitError::is_insufficient_data`] to tell a real defect from an expected
//! small-sample skip.

use thiserror::Error;

/// Main error type for gait geometry operations.
#[derive(Error, Debug)]
pub enum GaitError {
    /// Input file could not be interpreted at all.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Too few samples for a computation with a hard minimum.
    #[error("Insufficient data for {what}: need at least {min}, got {actual}")]
    InsufficientData {
        what: String,
        min: usize,
        actual: usize,
    },

    /// Matrix dimensions do not match the manifold or each other.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Matrix is not symmetric positive-definite.
    #[error("Matrix is not positive-definite: {context}")]
    NotPositiveDefinite { context: String },

    /// Numerical computation resulted in NaN or Inf.
    #[error("Numerical instability: {context}")]
    NumericalInstability { context: String },

    /// A joint required by the configuration is absent from the trial.
    #[error("Joint '{joint}' not found in trial (available: {})", available.join(", "))]
    MissingJoint {
        joint: String,
        available: Vec<String>,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON could not be read.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for gait geometry operations.
pub type Result<T> = std::result::Result<T, GaitError>;

impl GaitError {
    /// Create a parse error.
    #[must_use]
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an insufficient data error.
    #[must_use]
    pub fn insufficient_data(what: impl Into<String>, min: usize, actual: usize) -> Self {
        Self::InsufficientData {
            what: what.into(),
            min,
            actual,
        }
    }

    /// Create a dimension mismatch error.
    #[must_use]
    pub const fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create a not-positive-definite error.
    #[must_use]
    pub fn not_positive_definite(context: impl Into<String>) -> Self {
        Self::NotPositiveDefinite {
            context: context.into(),
        }
    }

    /// Create a numerical instability error.
    #[must_use]
    pub fn numerical_instability(context: impl Into<String>) -> Self {
        Self::NumericalInstability {
            context: context.into(),
        }
    }

    /// Create a missing joint error listing the joints that do exist.
    #[must_use]
    pub fn missing_joint(joint: impl Into<String>, available: Vec<String>) -> Self {
        Self::MissingJoint {
            joint: joint.into(),
            available,
        }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether this is a numerical failure of a manifold computation.
    #[must_use]
    pub const fn is_numerical(&self) -> bool {
        matches!(
            self,
            Self::NotPositiveDefinite { .. }
                | Self::NumericalInstability { .. }
                | Self::DimensionMismatch { .. }
        )
    }

    /// Whether this is an expected small-sample condition.
    #[must_use]
    pub const fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}
