//! Property-based tests for the quaternion kernel and gravity decomposition.
//!
//! Run with: cargo test -p sensor-fusion -- proptest

use proptest::prelude::*;
use sensor_fusion::{
    GravityDecomposer, global_to_local, hamilton_product, inverse, local_to_global, norm_squared,
};
use sensor_types::{Quaternion, Vector3};

// =============================================================================
// Strategies
// =============================================================================

/// Arbitrary quaternion, bounded away from zero norm.
fn arb_quat() -> impl Strategy<Value = Quaternion> {
    prop::array::uniform4(-2.0..2.0f32)
        .prop_map(Quaternion::from_array)
        .prop_filter("norm too small", |q| norm_squared(*q) > 0.05)
}

/// Unit quaternion.
fn arb_unit_quat() -> impl Strategy<Value = Quaternion> {
    arb_quat().prop_map(Quaternion::normalize)
}

fn arb_vec() -> impl Strategy<Value = Vector3> {
    prop::array::uniform3(-20.0..20.0f32).prop_map(Vector3::from_array)
}

fn close(a: Quaternion, b: Quaternion, eps: f32) -> bool {
    a.to_array()
        .iter()
        .zip(b.to_array().iter())
        .all(|(x, y)| (x - y).abs() <= eps * (1.0 + x.abs().max(y.abs())))
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn proptest_product_is_associative(a in arb_quat(), b in arb_quat(), c in arb_quat()) {
        let left = hamilton_product(hamilton_product(a, b), c);
        let right = hamilton_product(a, hamilton_product(b, c));
        prop_assert!(close(left, right, 1e-4), "{left:?} != {right:?}");
    }

    #[test]
    fn proptest_inverse_is_two_sided(q in arb_quat()) {
        prop_assert!(close(hamilton_product(q, inverse(q)), Quaternion::IDENTITY, 1e-4));
        prop_assert!(close(hamilton_product(inverse(q), q), Quaternion::IDENTITY, 1e-4));
    }

    #[test]
    fn proptest_rotation_round_trip(q in arb_quat(), v in arb_vec()) {
        let back = global_to_local(q, local_to_global(q, v));
        prop_assert!((back - v).length() < 1e-3 * (1.0 + v.length()), "{back:?} != {v:?}");
    }

    #[test]
    fn proptest_unit_rotation_preserves_length(q in arb_unit_quat(), v in arb_vec()) {
        let rotated = local_to_global(q, v);
        prop_assert!((rotated.length() - v.length()).abs() < 1e-3 * (1.0 + v.length()));
    }

    #[test]
    fn proptest_stationary_device_has_no_linear_acceleration(q in arb_unit_quat()) {
        let decomposer = GravityDecomposer::default();
        let measured = decomposer.gravity_in_device_frame(q);
        let linear = decomposer.linear_acceleration(q, measured);
        prop_assert!(linear.length() < 1e-3, "{linear:?}");
    }
}
