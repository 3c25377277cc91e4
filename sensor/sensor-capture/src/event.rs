//! Messages flowing into and out of the capture controller.

use std::fmt;

use serde::{Deserialize, Serialize};
use sensor_types::SensorEvent;

use crate::command::RemoteCommand;
use crate::snapshot::SnapshotSummary;

/// Input to the controller's event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// A sensor callback.
    Sensor(SensorEvent),
    /// One chunk of microphone samples.
    Audio(Vec<i16>),
    /// The audio worker stopped at the chunk ceiling.
    AudioLimitReached,
    /// A start or stop request.
    Command(RemoteCommand),
    /// Leave the event loop. A running session is stopped and dispatched first.
    Shutdown,
}

impl CaptureEvent {
    /// Returns true for sensor and audio data (as opposed to control).
    #[must_use]
    pub const fn is_data(&self) -> bool {
        matches!(self, Self::Sensor(_) | Self::Audio(_) | Self::AudioLimitReached)
    }
}

impl From<SensorEvent> for CaptureEvent {
    fn from(event: SensorEvent) -> Self {
        Self::Sensor(event)
    }
}

impl From<RemoteCommand> for CaptureEvent {
    fn from(command: RemoteCommand) -> Self {
        Self::Command(command)
    }
}

/// Human-facing capture status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaptureStatus {
    /// A session is recording.
    Recording,
    /// A finished snapshot is being handed to the transport.
    Sending,
    /// Idle.
    Stopped,
}

impl fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Recording => "Recording...",
            Self::Sending => "Sending...",
            Self::Stopped => "Stop",
        })
    }
}

/// Notifications published by the controller for status sinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CaptureNotice {
    /// The capture status changed.
    Status(CaptureStatus),
    /// No microphone configuration could be opened; recording is sensor-only.
    DeviceUnavailable,
    /// The audio chunk ceiling was reached; later audio is dropped.
    DurationExceeded {
        /// The ceiling that was hit.
        max_chunks: usize,
    },
    /// The transport accepted a snapshot.
    Delivered(SnapshotSummary),
    /// The transport rejected a snapshot.
    DeliveryFailed {
        /// Transport error message.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensor_types::{Timestamp, Vector3};

    #[test]
    fn status_text() {
        assert_eq!(CaptureStatus::Recording.to_string(), "Recording...");
        assert_eq!(CaptureStatus::Sending.to_string(), "Sending...");
        assert_eq!(CaptureStatus::Stopped.to_string(), "Stop");
    }

    #[test]
    fn event_is_data() {
        let sensor: CaptureEvent = SensorEvent::accelerometer(Timestamp::zero(), Vector3::Z).into();
        assert!(sensor.is_data());
        assert!(CaptureEvent::Audio(vec![0; 4]).is_data());
        assert!(CaptureEvent::AudioLimitReached.is_data());
        assert!(!CaptureEvent::from(RemoteCommand::StopSensing).is_data());
        assert!(!CaptureEvent::Shutdown.is_data());
    }
}
