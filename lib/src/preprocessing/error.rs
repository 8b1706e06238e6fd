//! Error types for preprocessing operations.

use thiserror::Error;

/// Error type for preprocessing operations.
#[derive(Debug, Error)]
pub enum PreprocessingError {
    /// Shape mismatch between expected and actual dimensions.
    #[error("Invalid shape: expected {expected}, got {got}")]
    InvalidShape { expected: String, got: String },
    /// Data contains missing values when not expected.
    #[error("Missing values: {0}")]
    MissingValues(String),
    /// A cell could not be interpreted as a number.
    #[error("Invalid numeric value {value:?} in column {column}")]
    InvalidNumber { column: String, value: String },
    /// A category was not seen during fit and the encoder cannot represent it.
    #[error("Unknown category {value:?} in column {column}")]
    UnknownCategory { column: String, value: String },
    /// A column required by a fitted step is absent from the input frame.
    #[error("Missing column: {0}")]
    MissingColumn(String),
    /// Invalid hyperparameter or configuration value.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Serialization or deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    IoError(String),
    /// Empty data provided where non-empty was required.
    #[error("Empty data: {0}")]
    EmptyData(String),
    /// Feature dimension mismatch.
    #[error("Feature mismatch: expected {expected_features} features, got {got_features}")]
    FeatureMismatch {
        expected_features: usize,
        got_features: usize,
    },
}

impl PreprocessingError {
    /// True when the error stems from the caller's data rather than the fitted state.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PreprocessingError::MissingValues(_)
                | PreprocessingError::InvalidNumber { .. }
                | PreprocessingError::UnknownCategory { .. }
                | PreprocessingError::MissingColumn(_)
        )
    }
}

impl From<std::io::Error> for PreprocessingError {
    fn from(err: std::io::Error) -> Self {
        PreprocessingError::IoError(err.to_string())
    }
}

impl From<bincode::Error> for PreprocessingError {
    fn from(err: bincode::Error) -> Self {
        PreprocessingError::SerializationError(err.to_string())
    }
}
