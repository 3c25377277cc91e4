//! Capture sessions for a wearable sensor recorder.
//!
//! This crate turns remote start/stop commands, a high-rate sensor stream
//! and a blocking microphone loop into one consistent [`Snapshot`] per
//! session, then hands it to a transport.
//!
//! # Session
//!
//! - [`SessionBuffer`] - Five channels plus chunk-bounded audio, Idle/Recording
//! - [`Snapshot`], [`AssetBundle`] - Finalized data and its wire rendering
//!
//! # Concurrency
//!
//! - [`CaptureController`] - Single writer for the session, fed by one bounded queue
//! - [`CaptureHandle`] - Cloneable producer side of that queue
//! - [`AudioWorker`] - Blocking read loop over an [`AudioDevice`]
//! - [`SnapshotDispatcher`] - Runs the [`SnapshotSink`] off the controller thread
//!
//! # Configuration
//!
//! [`CaptureConfig`] loads from TOML with `SENSOR_CAPTURE_*` environment
//! overrides.
//!
//! # Example
//!
//! ```
//! use sensor_capture::{RemoteCommand, SessionBuffer};
//! use sensor_types::{Quaternion, Timestamp};
//!
//! let command: RemoteCommand = "/start-sensing".parse().unwrap();
//! assert_eq!(command, RemoteCommand::StartSensing);
//!
//! let mut session = SessionBuffer::default();
//! session.start().unwrap();
//! session.record_rotation_vector(Timestamp::from_nanos(1), Quaternion::IDENTITY).unwrap();
//! let bundle = session.stop().unwrap().to_bundle(false);
//! assert_eq!(bundle.path(), "/sensor");
//! ```

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod command;
mod config;
mod controller;
mod error;
mod event;
mod recorder;
mod session;
mod snapshot;
mod transport;

// Re-export session types
pub use session::{SessionBuffer, SessionState};
pub use snapshot::{AUDIO_ASSET_KEY, AssetBundle, BUNDLE_PATH, Snapshot, SnapshotSummary};

// Re-export controller and messages
pub use command::{RemoteCommand, START_SENSING_PATH, STOP_SENSING_PATH};
pub use controller::{CaptureController, CaptureHandle};
pub use event::{CaptureEvent, CaptureNotice, CaptureStatus};

// Re-export audio capture
pub use recorder::{
    AudioDevice, AudioDeviceProvider, AudioFormat, AudioWorker, NoAudioDevices,
    PcmReaderDevice, SampleEncoding, WorkerExit, open_first_available,
};

// Re-export transport
pub use transport::{ChannelSink, DirectorySink, SnapshotDispatcher, SnapshotSink};

// Re-export configuration
pub use config::{
    AccelCalibration, AudioConfig, CaptureConfig, DEFAULT_SAMPLE_RATES, ENV_GRAVITY,
    ENV_GYROSCOPE, ENV_MAX_CHUNKS, SensorConfig,
};

// Re-export error types
pub use error::{CaptureError, ConfigError, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        CaptureConfig, CaptureController, CaptureError, CaptureEvent, CaptureHandle,
        CaptureNotice, RemoteCommand, SessionBuffer, Snapshot, SnapshotSink,
    };
}
