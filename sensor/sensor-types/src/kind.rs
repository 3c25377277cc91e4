//! Sensor and channel identifiers.

use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::SensorError;

/// A physical sensor that delivers events into a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SensorKind {
    /// Raw accelerometer, device frame, m/s² including gravity.
    Accelerometer,
    /// Fused orientation sensor reporting a quaternion.
    RotationVector,
    /// Angular rate, rad/s.
    Gyroscope,
}

impl SensorKind {
    /// All sensor kinds.
    pub const ALL: [Self; 3] = [Self::Accelerometer, Self::RotationVector, Self::Gyroscope];

    /// Number of float values an event of this kind carries.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::Accelerometer | Self::Gyroscope => 3,
            Self::RotationVector => 4,
        }
    }

    /// Short name used in event logs.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Accelerometer => "accel",
            Self::RotationVector => "rotvec",
            Self::Gyroscope => "gyro",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SensorKind {
    type Err = SensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| SensorError::UnknownKind(s.to_string()))
    }
}

/// One named time series inside a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ChannelKind {
    /// Raw accelerometer samples.
    Accelerometer,
    /// Gravity-free acceleration in the global frame.
    LinearAcceleration,
    /// Raw gyroscope samples.
    Gyroscope,
    /// Raw rotation-vector samples.
    RotationVector,
    /// Gravity expressed in the device frame.
    Gravity,
}

impl ChannelKind {
    /// All channel kinds, in session order.
    pub const ALL: [Self; 5] = [
        Self::Accelerometer,
        Self::LinearAcceleration,
        Self::Gyroscope,
        Self::RotationVector,
        Self::Gravity,
    ];

    /// Asset key used when the channel is pushed to the remote peer.
    #[must_use]
    pub const fn asset_key(self) -> &'static str {
        match self {
            Self::Accelerometer => "sensor.accel",
            Self::LinearAcceleration => "sensor.laccel",
            Self::Gyroscope => "sensor.gyro",
            Self::RotationVector => "sensor.rotvec",
            Self::Gravity => "sensor.grav",
        }
    }

    /// Returns true if the channel is computed from other channels.
    #[must_use]
    pub const fn is_derived(self) -> bool {
        matches!(self, Self::LinearAcceleration | Self::Gravity)
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.asset_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_arity() {
        assert_eq!(SensorKind::Accelerometer.arity(), 3);
        assert_eq!(SensorKind::Gyroscope.arity(), 3);
        assert_eq!(SensorKind::RotationVector.arity(), 4);
    }

    #[test]
    fn sensor_parse() {
        assert_eq!("accel".parse::<SensorKind>().ok(), Some(SensorKind::Accelerometer));
        assert_eq!("rotvec".parse::<SensorKind>().ok(), Some(SensorKind::RotationVector));
        assert_eq!("gyro".parse::<SensorKind>().ok(), Some(SensorKind::Gyroscope));
        assert!("magnet".parse::<SensorKind>().is_err());
    }

    #[test]
    fn channel_asset_keys() {
        assert_eq!(ChannelKind::Accelerometer.asset_key(), "sensor.accel");
        assert_eq!(ChannelKind::Gravity.asset_key(), "sensor.grav");
        assert_eq!(ChannelKind::LinearAcceleration.asset_key(), "sensor.laccel");
        assert_eq!(ChannelKind::RotationVector.asset_key(), "sensor.rotvec");
        assert_eq!(ChannelKind::Gyroscope.asset_key(), "sensor.gyro");
    }

    #[test]
    fn channel_derived() {
        let derived: Vec<_> = ChannelKind::ALL
            .into_iter()
            .filter(|k| k.is_derived())
            .collect();
        assert_eq!(derived, vec![ChannelKind::LinearAcceleration, ChannelKind::Gravity]);
    }
}
