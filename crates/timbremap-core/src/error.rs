//! Error types for timbremap-core.

use thiserror::Error;

/// Error type for stage, pipeline and numeric operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("{function}: argument {value} is outside the function's domain")]
    Domain { function: &'static str, value: f64 },

    #[error("{stage}: dimension {dim} has zero scale (degenerate training data)")]
    DegenerateScale { stage: &'static str, dim: usize },

    #[error("{stage}: expected width {expected}, got {actual}")]
    DimensionMismatch {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid stage: {0}")]
    InvalidStage(String),

    #[error("Matrix inversion failed: {0}")]
    Inversion(String),

    #[error("Batch contains no rows")]
    EmptyBatch,

    #[error("Validation grid of {steps}^{dims} rows ({rows:?}) exceeds the row budget")]
    GridTooLarge {
        dims: usize,
        steps: usize,
        rows: Option<usize>,
    },
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
