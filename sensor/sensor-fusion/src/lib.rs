//! Sensor fusion for wearable capture sessions.
//!
//! This crate provides the numeric core of a capture session:
//!
//! # Quaternion Kernel
//!
//! - [`hamilton_product`], [`inverse`], [`rotate`] - Raw quaternion algebra
//!   without a unit-norm assumption
//! - [`RotationDirection`] - Device-to-world or world-to-device
//!
//! # Gravity Decomposition
//!
//! - [`GravityDecomposer`] - Gravity in the device frame and gravity-free
//!   world-frame acceleration
//!
//! # Session Storage
//!
//! - [`Channel`] - Append-only time series for one signal
//! - [`AudioBuffer`] - Chunk-bounded 16-bit PCM buffer
//!
//! # Layer 0 Crate
//!
//! No threads, no I/O. Synchronization and lifecycle live in `sensor-capture`.
//!
//! # Example
//!
//! ```
//! use sensor_fusion::{Channel, GravityDecomposer};
//! use sensor_types::{ChannelKind, Quaternion, Timestamp, Vector3};
//!
//! let decomposer = GravityDecomposer::default();
//! let mut gravity = Channel::new(ChannelKind::Gravity);
//! let rotation = Quaternion::IDENTITY;
//! gravity.push(Timestamp::from_nanos(1), decomposer.gravity_in_device_frame(rotation));
//!
//! assert_eq!(gravity.latest().map(|s| s.value.z), Some(9.798));
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod audio;
mod channel;
mod error;
mod gravity;
mod quaternion;

// Re-export quaternion kernel
pub use quaternion::{
    RotationDirection, global_to_local, hamilton_product, inverse, local_to_global,
    norm_squared, pure, rotate,
};

// Re-export gravity decomposition
pub use gravity::{GravityDecomposer, STANDARD_GRAVITY, decompose_gravity, linear_acceleration};

// Re-export storage types
pub use audio::{AudioAppend, AudioBuffer, DEFAULT_CHUNK_SAMPLES, DEFAULT_MAX_CHUNKS};
pub use channel::{Channel, ChannelStats};

// Re-export error types
pub use error::{FusionError, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        AudioAppend, AudioBuffer, Channel, FusionError, GravityDecomposer, RotationDirection,
        hamilton_product, inverse, rotate,
    };
}
