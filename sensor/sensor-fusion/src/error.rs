//! Error types for sensor-fusion crate.

use thiserror::Error;

/// Errors that can occur in sensor fusion operations.
#[derive(Debug, Error)]
pub enum FusionError {
    /// An audio chunk did not have the configured length.
    #[error("audio chunk size mismatch: expected {expected} samples, got {actual}")]
    ChunkSizeMismatch {
        /// Configured samples per chunk.
        expected: usize,
        /// Samples actually supplied.
        actual: usize,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl FusionError {
    /// Creates a chunk size mismatch error.
    #[must_use]
    pub const fn chunk_size_mismatch(expected: usize, actual: usize) -> Self {
        Self::ChunkSizeMismatch { expected, actual }
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }
}

/// Result type for sensor fusion operations.
pub type Result<T> = std::result::Result<T, FusionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_chunk_size_mismatch() {
        let err = FusionError::chunk_size_mismatch(1024, 512);
        assert!(err.to_string().contains("1024"));
        assert!(err.to_string().contains("512"));
    }

    #[test]
    fn error_invalid_config() {
        let err = FusionError::invalid_config("chunk size must be positive");
        assert!(err.to_string().contains("invalid configuration"));
    }
}
