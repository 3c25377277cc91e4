//! Raw sensor events as delivered by the platform event source.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Quaternion, SensorError, SensorKind, Timestamp, Vector3};

/// The typed payload of a sensor event.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SensorReading {
    /// Device-frame acceleration including gravity.
    Accelerometer(Vector3),
    /// Orientation of the device relative to the global frame.
    RotationVector(Quaternion),
    /// Device-frame angular rate.
    Gyroscope(Vector3),
}

impl SensorReading {
    /// Returns the sensor that produced this reading.
    #[must_use]
    pub const fn kind(&self) -> SensorKind {
        match self {
            Self::Accelerometer(_) => SensorKind::Accelerometer,
            Self::RotationVector(_) => SensorKind::RotationVector,
            Self::Gyroscope(_) => SensorKind::Gyroscope,
        }
    }
}

/// A single timestamped sensor callback.
///
/// # Example
///
/// ```
/// use sensor_types::{SensorEvent, SensorKind, Timestamp};
///
/// let event = SensorEvent::from_values(
///     SensorKind::RotationVector,
///     Timestamp::from_nanos(1_000),
///     &[0.0, 0.0, 0.0, 1.0],
/// )
/// .unwrap();
/// assert_eq!(event.kind(), SensorKind::RotationVector);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorEvent {
    /// Event time, nanoseconds since the device epoch.
    pub timestamp: Timestamp,

    /// Typed payload.
    pub reading: SensorReading,
}

impl SensorEvent {
    /// Creates an event from a typed reading.
    #[must_use]
    pub const fn new(timestamp: Timestamp, reading: SensorReading) -> Self {
        Self { timestamp, reading }
    }

    /// Creates an accelerometer event.
    #[must_use]
    pub const fn accelerometer(timestamp: Timestamp, value: Vector3) -> Self {
        Self::new(timestamp, SensorReading::Accelerometer(value))
    }

    /// Creates a rotation-vector event.
    #[must_use]
    pub const fn rotation_vector(timestamp: Timestamp, value: Quaternion) -> Self {
        Self::new(timestamp, SensorReading::RotationVector(value))
    }

    /// Creates a gyroscope event.
    #[must_use]
    pub const fn gyroscope(timestamp: Timestamp, value: Vector3) -> Self {
        Self::new(timestamp, SensorReading::Gyroscope(value))
    }

    /// Builds an event from the raw float array of a platform callback.
    ///
    /// Extra trailing values are ignored (rotation-vector sensors may append
    /// a heading-accuracy estimate).
    ///
    /// # Errors
    ///
    /// Returns [`SensorError::ValueCount`] if fewer values than
    /// [`SensorKind::arity`] are supplied.
    pub fn from_values(
        kind: SensorKind,
        timestamp: Timestamp,
        values: &[f32],
    ) -> Result<Self, SensorError> {
        if values.len() < kind.arity() {
            return Err(SensorError::value_count(kind, values.len()));
        }

        let reading = match kind {
            SensorKind::Accelerometer => {
                SensorReading::Accelerometer(Vector3::new(values[0], values[1], values[2]))
            }
            SensorKind::Gyroscope => {
                SensorReading::Gyroscope(Vector3::new(values[0], values[1], values[2]))
            }
            SensorKind::RotationVector => SensorReading::RotationVector(Quaternion::from_xyzw(
                values[0], values[1], values[2], values[3],
            )),
        };
        Ok(Self { timestamp, reading })
    }

    /// Returns the sensor that produced this event.
    #[must_use]
    pub const fn kind(&self) -> SensorKind {
        self.reading.kind()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn from_values_accelerometer() {
        let event =
            SensorEvent::from_values(SensorKind::Accelerometer, Timestamp::zero(), &[1.0, 2.0, 3.0])
                .unwrap();
        assert_eq!(
            event.reading,
            SensorReading::Accelerometer(Vector3::new(1.0, 2.0, 3.0))
        );
    }

    #[test]
    fn from_values_rotation_ignores_accuracy() {
        let event = SensorEvent::from_values(
            SensorKind::RotationVector,
            Timestamp::from_nanos(9),
            &[0.1, 0.2, 0.3, 0.9, 0.5],
        )
        .unwrap();
        match event.reading {
            SensorReading::RotationVector(q) => {
                assert_eq!(q.to_array(), [0.1, 0.2, 0.3, 0.9]);
            }
            other => panic!("unexpected reading {other:?}"),
        }
    }

    #[test]
    fn from_values_too_short() {
        let err = SensorEvent::from_values(SensorKind::RotationVector, Timestamp::zero(), &[0.0; 3])
            .unwrap_err();
        assert!(err.to_string().contains("expected 4"));
    }

    #[test]
    fn event_kind() {
        let event = SensorEvent::gyroscope(Timestamp::zero(), Vector3::X);
        assert_eq!(event.kind(), SensorKind::Gyroscope);
    }
}
