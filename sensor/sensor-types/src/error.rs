//! Error types for sensor operations.

use thiserror::Error;

use crate::SensorKind;

/// Errors that can occur when decoding sensor data.
#[derive(Debug, Error)]
pub enum SensorError {
    /// An event carried too few values for its sensor kind.
    #[error("{kind} event: expected {expected} values, got {actual}")]
    ValueCount {
        /// Sensor kind of the event.
        kind: SensorKind,
        /// Values required for this kind.
        expected: usize,
        /// Values actually supplied.
        actual: usize,
    },

    /// Unrecognized sensor name.
    #[error("unknown sensor kind: {0}")]
    UnknownKind(String),

    /// A field of a textual sample could not be parsed.
    #[error("malformed sample: {0}")]
    Malformed(String),
}

impl SensorError {
    /// Creates a value count error for the given kind.
    #[must_use]
    pub const fn value_count(kind: SensorKind, actual: usize) -> Self {
        Self::ValueCount {
            kind,
            expected: kind.arity(),
            actual,
        }
    }

    /// Creates a malformed sample error.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_value_count() {
        let err = SensorError::value_count(SensorKind::Accelerometer, 2);
        let msg = format!("{err}");
        assert!(msg.contains("accel"));
        assert!(msg.contains('3'));
        assert!(msg.contains('2'));
    }

    #[test]
    fn error_unknown_kind() {
        let err = SensorError::UnknownKind("baro".to_string());
        assert!(err.to_string().contains("baro"));
    }

    #[test]
    fn error_malformed() {
        let err = SensorError::malformed("bad float 'x'");
        assert!(err.to_string().contains("malformed sample"));
    }
}
