//! Gravity and linear-acceleration decomposition.
//!
//! Uses the quaternion kernel to move gravity into the device frame and to
//! move accelerometer readings into the world frame, where gravity is
//! removed from the vertical axis.

use serde::{Deserialize, Serialize};
use sensor_types::{Quaternion, Vector3};

use crate::quaternion::{global_to_local, local_to_global};

/// Gravity magnitude used by the wearable's reference recordings, m/s².
pub const STANDARD_GRAVITY: f32 = 9.798;

/// Splits accelerometer readings into gravity and linear acceleration.
///
/// The world frame is assumed to have Z pointing up, so gravity removal
/// subtracts the magnitude from the global Z component only. Horizontal
/// gravity leakage from a tilted global frame is not compensated.
///
/// # Example
///
/// ```
/// use sensor_fusion::GravityDecomposer;
/// use sensor_types::{Quaternion, Vector3};
///
/// let decomposer = GravityDecomposer::default();
/// let gravity = decomposer.gravity_in_device_frame(Quaternion::IDENTITY);
/// assert_eq!(gravity, Vector3::new(0.0, 0.0, 9.798));
///
/// let linear = decomposer
///     .linear_acceleration(Quaternion::IDENTITY, Vector3::new(0.0, 0.0, 9.798));
/// assert!(linear.length() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GravityDecomposer {
    /// Gravity magnitude in m/s².
    magnitude: f32,
}

impl Default for GravityDecomposer {
    fn default() -> Self {
        Self::new(STANDARD_GRAVITY)
    }
}

impl GravityDecomposer {
    /// Creates a decomposer with the given gravity magnitude.
    #[must_use]
    pub const fn new(magnitude: f32) -> Self {
        Self { magnitude }
    }

    /// Returns the gravity magnitude.
    #[must_use]
    pub const fn magnitude(&self) -> f32 {
        self.magnitude
    }

    /// Gravity vector in the world frame.
    #[must_use]
    pub const fn global_gravity(&self) -> Vector3 {
        Vector3::new(0.0, 0.0, self.magnitude)
    }

    /// Rotates world gravity into the device frame described by `rotation`.
    #[must_use]
    pub fn gravity_in_device_frame(&self, rotation: Quaternion) -> Vector3 {
        global_to_local(rotation, self.global_gravity())
    }

    /// Rotates `accel` into the world frame and removes gravity from Z.
    #[must_use]
    pub fn linear_acceleration(&self, rotation: Quaternion, accel: Vector3) -> Vector3 {
        let mut global = local_to_global(rotation, accel);
        global.z -= self.magnitude;
        global
    }
}

/// Gravity in the device frame using [`STANDARD_GRAVITY`].
#[must_use]
pub fn decompose_gravity(rotation: Quaternion) -> Vector3 {
    GravityDecomposer::default().gravity_in_device_frame(rotation)
}

/// Gravity-free world-frame acceleration using [`STANDARD_GRAVITY`].
#[must_use]
pub fn linear_acceleration(rotation: Quaternion, accel: Vector3) -> Vector3 {
    GravityDecomposer::default().linear_acceleration(rotation, accel)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn identity_gravity_is_exact() {
        assert_eq!(
            decompose_gravity(Quaternion::IDENTITY),
            Vector3::new(0.0, 0.0, 9.798)
        );
    }

    #[test]
    fn level_stationary_device_has_no_linear_acceleration() {
        let linear = linear_acceleration(Quaternion::IDENTITY, Vector3::new(0.0, 0.0, 9.798));
        assert_eq!(linear, Vector3::ZERO);
    }

    #[test]
    fn tilted_device_sees_gravity_on_other_axis() {
        // Device rolled 90° about X: world up maps onto a horizontal device axis.
        let q = Quaternion::from_rotation_x(FRAC_PI_2);
        let g = decompose_gravity(q);
        assert_relative_eq!(g.length(), STANDARD_GRAVITY, epsilon = 1e-4);
        assert!(g.z.abs() < 1e-4);
        assert_relative_eq!(g.y.abs(), STANDARD_GRAVITY, epsilon = 1e-4);
    }

    #[test]
    fn gravity_reading_cancels_in_any_orientation() {
        // A stationary device measures exactly the gravity rotated into its frame.
        let q = Quaternion::from_xyzw(0.2, -0.3, 0.1, 0.9).normalize();
        let measured = decompose_gravity(q);
        let linear = linear_acceleration(q, measured);
        assert!(linear.length() < 1e-4, "{linear:?}");
    }

    #[test]
    fn constant_z_subtraction() {
        // Pure horizontal acceleration with identity orientation keeps -g on Z.
        let linear = linear_acceleration(Quaternion::IDENTITY, Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(linear.x, 1.0);
        assert_relative_eq!(linear.z, -STANDARD_GRAVITY);
    }

    #[test]
    fn custom_magnitude() {
        let d = GravityDecomposer::new(9.81);
        assert_eq!(d.magnitude(), 9.81);
        assert_eq!(d.global_gravity(), Vector3::new(0.0, 0.0, 9.81));
    }
}
