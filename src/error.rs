use thiserror::Error;

/// Error types for the multifit-rs library.
#[derive(Error, Debug)]
pub enum MultifitError {
    /// Error indicating a mismatch in vector or matrix dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error for argument values outside their documented domain.
    #[error("Invalid parameter value: {0}")]
    InvalidParameter(String),

    /// Error for an incomplete or out-of-range fitter configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Error raised by a model evaluator or objective.
    #[error("Function evaluation error: {0}")]
    FunctionEvaluation(String),

    /// Linear algebra error.
    #[error("Linear algebra error: {0}")]
    LinearAlgebraError(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for multifit-rs operations.
pub type Result<T> = std::result::Result<T, MultifitError>;

/// Fails with [`MultifitError::DimensionMismatch`] unless `actual == expected`.
pub(crate) fn check_dimension(what: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(MultifitError::DimensionMismatch(format!(
            "{}: expected {}, got {}",
            what, expected, actual
        )));
    }
    Ok(())
}
