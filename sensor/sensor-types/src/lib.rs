//! Sensor data types for wearable capture sessions.
//!
//! This crate provides the data model shared by the fusion and capture
//! crates:
//!
//! - [`Timestamp`] - Nanoseconds since the device epoch
//! - [`TimedSample`] - A value paired with its timestamp
//! - [`Vector3`], [`Quaternion`] - Single-precision payloads (`glam`)
//! - [`SensorKind`] - Physical sensors feeding a session
//! - [`ChannelKind`] - Time series stored in a session, with asset keys
//! - [`SensorEvent`] - A decoded platform sensor callback
//!
//! # Example
//!
//! ```
//! use sensor_types::{ChannelKind, SensorEvent, Timestamp, Vector3};
//!
//! let event = SensorEvent::accelerometer(Timestamp::from_nanos(1), Vector3::new(0.0, 0.0, 9.798));
//! assert_eq!(ChannelKind::Accelerometer.asset_key(), "sensor.accel");
//! assert!(event.timestamp > Timestamp::zero());
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
mod event;
mod kind;
mod sample;
mod time;

pub use error::SensorError;
pub use event::{SensorEvent, SensorReading};
pub use kind::{ChannelKind, SensorKind};
pub use sample::{Quaternion, SampleValue, TimedSample, Vector3};
pub use time::Timestamp;
