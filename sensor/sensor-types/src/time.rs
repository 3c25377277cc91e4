//! Time types for sensor data.
//!
//! Sensor timestamps are nanoseconds since an arbitrary device epoch
//! (typically boot time), so they are only comparable within one device.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Nanosecond-precision sensor timestamp.
///
/// Signed, because the platform event source reports an `i64` and the
/// epoch is device-defined rather than the Unix epoch.
///
/// # Example
///
/// ```
/// use sensor_types::Timestamp;
///
/// let ts = Timestamp::from_nanos(1_500_000_000);
/// assert!((ts.as_secs_f64() - 1.5).abs() < 1e-9);
/// assert_eq!(ts.to_string(), "1500000000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Timestamp {
    /// Nanoseconds since the device epoch.
    nanos: i64,
}

impl Timestamp {
    /// Creates a timestamp from nanoseconds.
    #[must_use]
    pub const fn from_nanos(nanos: i64) -> Self {
        Self { nanos }
    }

    /// Creates a timestamp from seconds (floating point).
    ///
    /// Values outside the `i64` nanosecond range saturate.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_secs_f64(secs: f64) -> Self {
        Self {
            nanos: (secs * 1e9) as i64,
        }
    }

    /// Returns the timestamp as nanoseconds.
    #[must_use]
    pub const fn as_nanos(self) -> i64 {
        self.nanos
    }

    /// Returns the timestamp as seconds (floating point).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_secs_f64(self) -> f64 {
        self.nanos as f64 / 1e9
    }

    /// Returns the zero timestamp.
    #[must_use]
    pub const fn zero() -> Self {
        Self { nanos: 0 }
    }

    /// Returns the elapsed nanoseconds from `earlier` to `self`.
    ///
    /// Saturates instead of overflowing; negative when `earlier` is later.
    #[must_use]
    pub const fn nanos_since(self, earlier: Self) -> i64 {
        self.nanos.saturating_sub(earlier.nanos)
    }
}

impl From<i64> for Timestamp {
    fn from(nanos: i64) -> Self {
        Self::from_nanos(nanos)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_from_nanos() {
        let ts = Timestamp::from_nanos(42);
        assert_eq!(ts.as_nanos(), 42);
    }

    #[test]
    fn timestamp_from_secs() {
        let ts = Timestamp::from_secs_f64(2.5);
        assert_eq!(ts.as_nanos(), 2_500_000_000);
    }

    #[test]
    fn timestamp_negative() {
        let ts = Timestamp::from_nanos(-5);
        assert!(ts < Timestamp::zero());
        assert_eq!(ts.to_string(), "-5");
    }

    #[test]
    fn timestamp_ordering() {
        let a = Timestamp::from_nanos(100);
        let b = Timestamp::from_nanos(200);
        assert!(a < b);
        assert_eq!(b.nanos_since(a), 100);
        assert_eq!(a.nanos_since(b), -100);
    }

    #[test]
    fn timestamp_nanos_since_saturates() {
        let a = Timestamp::from_nanos(i64::MIN);
        let b = Timestamp::from_nanos(i64::MAX);
        assert_eq!(b.nanos_since(a), i64::MAX);
    }

    #[test]
    fn timestamp_from_i64() {
        let ts: Timestamp = 7_i64.into();
        assert_eq!(ts, Timestamp::from_nanos(7));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn timestamp_serializes_as_integer() {
        let json = serde_json::to_string(&Timestamp::from_nanos(123)).unwrap_or_default();
        assert_eq!(json, "123");
    }
}
