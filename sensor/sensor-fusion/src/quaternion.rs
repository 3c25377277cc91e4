//! Quaternion algebra for frame rotation.
//!
//! All functions operate on raw `(x, y, z, w)` components and make no
//! unit-norm assumption, unlike `glam::Quat`'s own operators. A zero
//! quaternion has no inverse; its components become NaN/inf and propagate
//! through every result that uses it.

// Quaternion algebra uses standard single-letter names
#![allow(clippy::many_single_char_names)]

use serde::{Deserialize, Serialize};
use sensor_types::{Quaternion, Vector3};

/// Direction of a frame rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RotationDirection {
    /// Device frame to world frame: `q⁻¹ · v · q`.
    ///
    /// Under [`hamilton_product`]'s sign convention this is glam's active
    /// rotation `q * v`.
    LocalToGlobal,
    /// World frame to device frame: `q · v · q⁻¹`, glam's `q.inverse() * v`.
    GlobalToLocal,
}

/// Hamilton product `a · b`.
///
/// Non-commutative, associative. The cross-product terms carry the opposite
/// sign from glam's `Mul`, so `hamilton_product(a, b)` equals glam's `b * a`
/// and `i · j = -k`.
///
/// # Example
///
/// ```
/// use sensor_fusion::hamilton_product;
/// use sensor_types::Quaternion;
///
/// let i = Quaternion::from_xyzw(1.0, 0.0, 0.0, 0.0);
/// let j = Quaternion::from_xyzw(0.0, 1.0, 0.0, 0.0);
/// let k = hamilton_product(i, j);
/// assert_eq!(k.to_array(), [0.0, 0.0, -1.0, 0.0]);
/// assert_eq!(hamilton_product(i, j), j * i);
/// ```
#[must_use]
pub fn hamilton_product(a: Quaternion, b: Quaternion) -> Quaternion {
    Quaternion::from_xyzw(
        a.w * b.x + a.x * b.w - a.y * b.z + a.z * b.y,
        a.w * b.y + a.x * b.z + a.y * b.w - a.z * b.x,
        a.w * b.z - a.x * b.y + a.y * b.x + a.z * b.w,
        a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
    )
}

/// Squared norm `x² + y² + z² + w²`.
///
/// Zero means the quaternion has no inverse.
#[must_use]
pub fn norm_squared(q: Quaternion) -> f32 {
    q.w * q.w + q.x * q.x + q.y * q.y + q.z * q.z
}

/// Multiplicative inverse: the conjugate divided by the squared norm.
///
/// Not guarded against a zero norm.
#[must_use]
pub fn inverse(q: Quaternion) -> Quaternion {
    let denom = norm_squared(q);
    Quaternion::from_xyzw(-q.x / denom, -q.y / denom, -q.z / denom, q.w / denom)
}

/// Lifts a vector to a pure quaternion (zero scalar part).
#[must_use]
pub const fn pure(v: Vector3) -> Quaternion {
    Quaternion::from_xyzw(v.x, v.y, v.z, 0.0)
}

/// Rotates `v` by `q` in the given direction.
///
/// The scalar part of the product is discarded.
#[must_use]
pub fn rotate(q: Quaternion, v: Vector3, direction: RotationDirection) -> Vector3 {
    let v4 = pure(v);
    let r = match direction {
        RotationDirection::LocalToGlobal => hamilton_product(hamilton_product(inverse(q), v4), q),
        RotationDirection::GlobalToLocal => hamilton_product(hamilton_product(q, v4), inverse(q)),
    };
    Vector3::new(r.x, r.y, r.z)
}

/// Rotates a device-frame vector into the world frame.
#[must_use]
pub fn local_to_global(q: Quaternion, v: Vector3) -> Vector3 {
    rotate(q, v, RotationDirection::LocalToGlobal)
}

/// Rotates a world-frame vector into the device frame.
#[must_use]
pub fn global_to_local(q: Quaternion, v: Vector3) -> Vector3 {
    rotate(q, v, RotationDirection::GlobalToLocal)
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

    fn assert_quat_eq(a: Quaternion, b: Quaternion, eps: f32) {
        for (x, y) in a.to_array().iter().zip(b.to_array().iter()) {
            assert!((x - y).abs() < eps, "{a:?} != {b:?}");
        }
    }

    fn assert_vec_eq(a: Vector3, b: Vector3, eps: f32) {
        assert!((a - b).length() < eps, "{a:?} != {b:?}");
    }

    fn sample_quats() -> Vec<Quaternion> {
        vec![
            Quaternion::from_xyzw(0.1, 0.2, 0.3, 0.9),
            Quaternion::from_xyzw(-0.5, 0.5, 0.5, 0.5),
            Quaternion::from_xyzw(0.0, 0.7071, 0.0, 0.7071),
            // Not unit norm
            Quaternion::from_xyzw(1.0, 2.0, -1.5, 0.5),
        ]
    }

    #[test]
    fn product_identity() {
        let q = Quaternion::from_xyzw(0.3, -0.2, 0.6, 0.7);
        assert_quat_eq(hamilton_product(Quaternion::IDENTITY, q), q, 1e-7);
        assert_quat_eq(hamilton_product(q, Quaternion::IDENTITY), q, 1e-7);
    }

    #[test]
    fn product_basis() {
        let i = Quaternion::from_xyzw(1.0, 0.0, 0.0, 0.0);
        let j = Quaternion::from_xyzw(0.0, 1.0, 0.0, 0.0);
        let k = Quaternion::from_xyzw(0.0, 0.0, 1.0, 0.0);

        assert_quat_eq(hamilton_product(i, j), -k, 1e-7);
        assert_quat_eq(hamilton_product(j, k), -i, 1e-7);
        assert_quat_eq(hamilton_product(k, i), -j, 1e-7);
        assert_quat_eq(hamilton_product(j, i), k, 1e-7);
        // i² = -1
        assert_quat_eq(
            hamilton_product(i, i),
            Quaternion::from_xyzw(0.0, 0.0, 0.0, -1.0),
            1e-7,
        );
    }

    #[test]
    fn product_not_commutative() {
        let a = Quaternion::from_xyzw(0.1, 0.2, 0.3, 0.9);
        let b = Quaternion::from_xyzw(-0.4, 0.1, 0.8, 0.2);
        let ab = hamilton_product(a, b);
        let ba = hamilton_product(b, a);
        assert!((ab - ba).length() > 1e-3);
    }

    #[test]
    fn product_associative() {
        let a = Quaternion::from_xyzw(0.1, 0.2, 0.3, 0.9);
        let b = Quaternion::from_xyzw(-0.4, 0.1, 0.8, 0.2);
        let c = Quaternion::from_xyzw(0.5, -0.5, 0.25, 1.5);
        let left = hamilton_product(hamilton_product(a, b), c);
        let right = hamilton_product(a, hamilton_product(b, c));
        assert_quat_eq(left, right, 1e-5);
    }

    #[test]
    fn product_is_reversed_glam_product() {
        let a = Quaternion::from_rotation_x(0.4);
        let b = Quaternion::from_rotation_z(-1.1);
        assert_quat_eq(hamilton_product(a, b), b * a, 1e-6);

        // Holds without unit norm too
        let c = Quaternion::from_xyzw(1.0, 2.0, -1.5, 0.5);
        let d = Quaternion::from_xyzw(-0.4, 0.1, 0.8, 0.2);
        assert_quat_eq(hamilton_product(c, d), d * c, 1e-5);
    }

    #[test]
    fn inverse_of_unit_is_conjugate() {
        let q = Quaternion::from_rotation_y(0.8);
        assert_quat_eq(inverse(q), q.conjugate(), 1e-6);
    }

    #[test]
    fn inverse_non_unit() {
        let q = Quaternion::from_xyzw(1.0, 2.0, -1.5, 0.5);
        let product = hamilton_product(q, inverse(q));
        assert_quat_eq(product, Quaternion::IDENTITY, 1e-6);
        assert_quat_eq(inverse(inverse(q)), q, 1e-5);
    }

    #[test]
    fn inverse_zero_propagates_nan() {
        let inv = inverse(Quaternion::from_xyzw(0.0, 0.0, 0.0, 0.0));
        assert!(inv.to_array().iter().all(|c| c.is_nan()));

        let rotated = local_to_global(Quaternion::from_xyzw(0.0, 0.0, 0.0, 0.0), Vector3::Z);
        assert!(rotated.is_nan());
    }

    #[test]
    fn norm_squared_sums_components() {
        let q = Quaternion::from_xyzw(1.0, 2.0, 3.0, 4.0);
        assert_relative_eq!(norm_squared(q), 30.0);
    }

    #[test]
    fn identity_rotation_is_noop() {
        let v = Vector3::new(1.5, -2.0, 9.0);
        for direction in [RotationDirection::LocalToGlobal, RotationDirection::GlobalToLocal] {
            assert_eq!(rotate(Quaternion::IDENTITY, v, direction), v);
        }
    }

    #[test]
    fn round_trip_reconstructs_vector() {
        let v = Vector3::new(0.3, -4.0, 9.798);
        for q in sample_quats() {
            let there = local_to_global(q, v);
            let back = local_to_global(inverse(q), there);
            assert_vec_eq(back, v, 1e-4);
        }
    }

    #[test]
    fn directions_are_inverse_of_each_other() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        for q in sample_quats() {
            let back = global_to_local(q, local_to_global(q, v));
            assert_vec_eq(back, v, 1e-4);
        }
    }

    #[test]
    fn directions_match_glam() {
        let q = Quaternion::from_rotation_z(FRAC_PI_2);
        let v = Vector3::X;
        assert_vec_eq(local_to_global(q, v), q * v, 1e-6);
        assert_vec_eq(local_to_global(q, v), Vector3::Y, 1e-6);
        assert_vec_eq(global_to_local(q, v), q.inverse() * v, 1e-6);
        assert_vec_eq(global_to_local(q, v), Vector3::NEG_Y, 1e-6);
    }

    #[test]
    fn rotation_preserves_length_for_unit_quaternions() {
        let q = Quaternion::from_xyzw(0.1, 0.2, 0.3, 0.9).normalize();
        let v = Vector3::new(3.0, -1.0, 2.0);
        assert_relative_eq!(local_to_global(q, v).length(), v.length(), epsilon = 1e-5);
    }

    #[test]
    fn pure_has_zero_scalar() {
        let p = pure(Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(p.to_array(), [1.0, 2.0, 3.0, 0.0]);
    }
}
