//! Error types for capture sessions.

use std::path::PathBuf;

use sensor_fusion::FusionError;
use sensor_types::SensorError;
use thiserror::Error;

use crate::session::SessionState;

/// Errors that can occur while capturing a session.
///
/// None of these are fatal to the controller: a rejected operation leaves
/// the session exactly as it was.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The operation is not valid in the current session state.
    #[error("cannot {operation} while {state}")]
    InvalidState {
        /// Rejected operation.
        operation: &'static str,
        /// State the session was in.
        state: SessionState,
    },

    /// No audio configuration could be opened.
    #[error("no compatible audio capture configuration ({tried} tried)")]
    CaptureDeviceUnavailable {
        /// Number of configurations probed.
        tried: usize,
    },

    /// The audio device failed after it was opened.
    #[error("audio device error: {0}")]
    Device(String),

    /// Snapshot audio cannot be exported without a known format.
    #[error("snapshot has no audio format (sensor-only session)")]
    MissingAudioFormat,

    /// The event queue is full.
    #[error("capture event queue is full")]
    QueueFull,

    /// The controller is no longer receiving events.
    #[error("capture controller is not running")]
    QueueClosed,

    /// A remote command path was not recognized.
    #[error("unknown remote command path: {0}")]
    UnknownCommand(String),

    /// The transport collaborator rejected a snapshot.
    #[error("transport failed: {0}")]
    Transport(String),

    /// Sample storage error.
    #[error(transparent)]
    Fusion(#[from] FusionError),

    /// Malformed sensor data.
    #[error(transparent)]
    Sensor(#[from] SensorError),

    /// Configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// WAV export error.
    #[error("wav export failed: {0}")]
    Wav(#[from] hound::Error),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptureError {
    /// Creates an invalid state error.
    #[must_use]
    pub const fn invalid_state(operation: &'static str, state: SessionState) -> Self {
        Self::InvalidState { operation, state }
    }

    /// Creates a device error.
    #[must_use]
    pub fn device(reason: impl Into<String>) -> Self {
        Self::Device(reason.into())
    }

    /// Creates a transport error.
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport(reason.into())
    }

    /// Returns true for a rejected state transition.
    #[must_use]
    pub const fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }
}

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("failed to parse config {path}: {message}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A value is out of range.
    #[error("invalid config value for {key}: {reason}")]
    InvalidValue {
        /// Offending key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for capture operations.
pub type Result<T> = std::result::Result<T, CaptureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_invalid_state() {
        let err = CaptureError::invalid_state("stop", SessionState::Idle);
        assert_eq!(err.to_string(), "cannot stop while idle");
        assert!(err.is_invalid_state());
    }

    #[test]
    fn error_device_unavailable() {
        let err = CaptureError::CaptureDeviceUnavailable { tried: 6 };
        assert!(err.to_string().contains("6 tried"));
        assert!(!err.is_invalid_state());
    }

    #[test]
    fn error_from_fusion() {
        let err: CaptureError = FusionError::chunk_size_mismatch(1024, 3).into();
        assert!(err.to_string().contains("1024"));
    }

    #[test]
    fn config_error_invalid_value() {
        let err = ConfigError::invalid_value("audio.max_chunks", "must be positive");
        assert!(err.to_string().contains("audio.max_chunks"));
    }
}
