//! Error types shared across Runehaven crates.

use thiserror::Error;

/// Top-level error type for Runehaven operations.
#[derive(Debug, Error)]
pub enum RunehavenError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Data failed validation after loading
    #[error("Invalid data in {source_name}: {reason}")]
    InvalidData {
        /// Where the data came from (file name, profile key)
        source_name: String,
        /// What was wrong with it
        reason: String,
    },
}

impl RunehavenError {
    /// Builds a serialization error from any displayable parser error.
    pub fn serialization(err: impl std::fmt::Display) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for Runehaven operations.
pub type RunehavenResult<T> = Result<T, RunehavenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RunehavenError::InvalidData {
            source_name: "profiles.ron".to_string(),
            reason: "aggro_range must be positive".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid data in profiles.ron: aggro_range must be positive"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: RunehavenError = io.into();
        assert!(matches!(err, RunehavenError::Io(_)));
    }
}
