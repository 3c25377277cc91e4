//! Timestamped samples and the vector types they carry.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Timestamp;

/// Three-component single-precision vector (acceleration, gravity, angular rate).
pub type Vector3 = glam::Vec3;

/// Four-component orientation sample in `(x, y, z, w)` order.
///
/// No unit-norm invariant is implied: rotation-vector sensors report
/// near-unit quaternions and the values are stored exactly as reported.
pub type Quaternion = glam::Quat;

/// A payload that can be flattened into its float components.
///
/// Component order is the serialization order: `x, y, z` for vectors and
/// `x, y, z, w` for quaternions.
pub trait SampleValue: Copy {
    /// Fixed-size component array.
    type Components: AsRef<[f32]>;

    /// Returns the components in serialization order.
    fn components(&self) -> Self::Components;
}

impl SampleValue for Vector3 {
    type Components = [f32; 3];

    fn components(&self) -> [f32; 3] {
        self.to_array()
    }
}

impl SampleValue for Quaternion {
    type Components = [f32; 4];

    fn components(&self) -> [f32; 4] {
        self.to_array()
    }
}

/// A value paired with the timestamp it was measured at.
///
/// # Example
///
/// ```
/// use sensor_types::{TimedSample, Timestamp, Vector3};
///
/// let sample = TimedSample::new(Timestamp::from_nanos(10), Vector3::new(0.0, 0.0, 9.8));
/// assert_eq!(sample.timestamp.as_nanos(), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimedSample<T> {
    /// Measurement time.
    pub timestamp: Timestamp,

    /// Measured (or derived) value.
    pub value: T,
}

impl<T> TimedSample<T> {
    /// Creates a new sample.
    #[must_use]
    pub const fn new(timestamp: Timestamp, value: T) -> Self {
        Self { timestamp, value }
    }

    /// Maps the value, keeping the timestamp.
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> TimedSample<U> {
        TimedSample {
            timestamp: self.timestamp,
            value: f(self.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_components_order() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        assert_eq!(v.components(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn quaternion_components_order() {
        let q = Quaternion::from_xyzw(0.1, 0.2, 0.3, 0.4);
        assert_eq!(q.components(), [0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn quaternion_is_not_normalized_on_construction() {
        let q = Quaternion::from_xyzw(0.0, 0.0, 0.0, 2.0);
        assert_eq!(q.w, 2.0);
    }

    #[test]
    fn sample_map_keeps_timestamp() {
        let sample = TimedSample::new(Timestamp::from_nanos(5), 2.0_f32);
        let doubled = sample.map(|v| v * 2.0);
        assert_eq!(doubled.timestamp, Timestamp::from_nanos(5));
        assert_eq!(doubled.value, 4.0);
    }
}
