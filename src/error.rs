//! Error types for the Kolosal benchmark harness

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for harness operations
pub type Result<T> = std::result::Result<T, KolosalError>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum KolosalError {
    /// The input file is not present. Fetching it is left to the operator.
    #[error("Data unavailable: {} not found (download it before running)", path.display())]
    DataUnavailable { path: PathBuf },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration unsupported: {0}")]
    ConfigurationUnsupported(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Search error: {0}")]
    SearchError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl KolosalError {
    pub(crate) fn invalid_parameter(
        name: &str,
        value: impl ToString,
        reason: &str,
    ) -> Self {
        KolosalError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<polars::error::PolarsError> for KolosalError {
    fn from(err: polars::error::PolarsError) -> Self {
        KolosalError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for KolosalError {
    fn from(err: serde_json::Error) -> Self {
        KolosalError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for KolosalError {
    fn from(err: ndarray::ShapeError) -> Self {
        KolosalError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = KolosalError::InvalidInput("empty test set".to_string());
        assert_eq!(err.to_string(), "Invalid input: empty test set");
    }

    #[test]
    fn test_data_unavailable_names_path() {
        let err = KolosalError::DataUnavailable { path: PathBuf::from("HIGGS.csv.gz") };
        assert!(err.to_string().contains("HIGGS.csv.gz"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: KolosalError = io_err.into();
        assert!(matches!(err, KolosalError::IoError(_)));
    }

    #[test]
    fn test_invalid_parameter_helper() {
        let err = KolosalError::invalid_parameter("cv_folds", 1, "must be at least 2");
        assert_eq!(err.to_string(), "Invalid parameter: cv_folds = 1, must be at least 2");
    }
}
