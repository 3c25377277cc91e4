//! Per-session sample storage and its recording lifecycle.

use std::fmt;

use serde::{Deserialize, Serialize};
use sensor_fusion::{AudioAppend, AudioBuffer, Channel, GravityDecomposer};
use sensor_types::{ChannelKind, Quaternion, SensorEvent, SensorReading, Timestamp, Vector3};
use tracing::{debug, info};

use crate::config::CaptureConfig;
use crate::error::{CaptureError, Result};
use crate::recorder::AudioFormat;
use crate::snapshot::Snapshot;

/// Recording state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SessionState {
    /// Not recording; data is rejected.
    #[default]
    Idle,
    /// Recording; data is appended.
    Recording,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
        })
    }
}

/// All channels and audio of one capture session.
///
/// Not synchronized: exactly one owner (the controller's event loop) mutates
/// it. Every rotation-vector sample also derives one gravity sample and,
/// once an accelerometer sample exists, one linear-acceleration sample
/// paired with the rotation timestamp.
///
/// # Example
///
/// ```
/// use sensor_capture::SessionBuffer;
/// use sensor_types::{ChannelKind, Quaternion, Timestamp, Vector3};
///
/// let mut session = SessionBuffer::default();
/// session.start().unwrap();
/// session.record_rotation_vector(Timestamp::from_nanos(1), Quaternion::IDENTITY).unwrap();
/// session.record_accelerometer(Timestamp::from_nanos(2), Vector3::new(0.0, 0.0, 9.798)).unwrap();
/// session.record_rotation_vector(Timestamp::from_nanos(3), Quaternion::IDENTITY).unwrap();
///
/// let snapshot = session.stop().unwrap();
/// assert_eq!(snapshot.channel_len(ChannelKind::Gravity), 2);
/// assert_eq!(snapshot.channel_len(ChannelKind::LinearAcceleration), 1);
/// assert!(snapshot.linear_acceleration[0].value.length() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct SessionBuffer {
    state: SessionState,
    decomposer: GravityDecomposer,
    accelerometer: Channel<Vector3>,
    linear_acceleration: Channel<Vector3>,
    gyroscope: Channel<Vector3>,
    rotation_vector: Channel<Quaternion>,
    gravity: Channel<Vector3>,
    audio: AudioBuffer,
    audio_format: Option<AudioFormat>,
}

impl Default for SessionBuffer {
    fn default() -> Self {
        Self::new(GravityDecomposer::default(), AudioBuffer::default())
    }
}

impl SessionBuffer {
    /// Creates an idle session.
    #[must_use]
    pub const fn new(decomposer: GravityDecomposer, audio: AudioBuffer) -> Self {
        Self {
            state: SessionState::Idle,
            decomposer,
            accelerometer: Channel::new(ChannelKind::Accelerometer),
            linear_acceleration: Channel::new(ChannelKind::LinearAcceleration),
            gyroscope: Channel::new(ChannelKind::Gyroscope),
            rotation_vector: Channel::new(ChannelKind::RotationVector),
            gravity: Channel::new(ChannelKind::Gravity),
            audio,
            audio_format: None,
        }
    }

    /// Creates an idle session sized by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the audio dimensions are zero.
    pub fn from_config(config: &CaptureConfig) -> Result<Self> {
        let audio = AudioBuffer::new(config.audio.chunk_samples, config.audio.max_chunks)?;
        Ok(Self::new(
            GravityDecomposer::new(config.sensors.gravity),
            audio,
        ))
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Returns true while recording.
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        matches!(self.state, SessionState::Recording)
    }

    /// Number of samples in a channel.
    #[must_use]
    pub fn channel_len(&self, kind: ChannelKind) -> usize {
        match kind {
            ChannelKind::Accelerometer => self.accelerometer.len(),
            ChannelKind::LinearAcceleration => self.linear_acceleration.len(),
            ChannelKind::Gyroscope => self.gyroscope.len(),
            ChannelKind::RotationVector => self.rotation_vector.len(),
            ChannelKind::Gravity => self.gravity.len(),
        }
    }

    /// Stored audio.
    #[must_use]
    pub const fn audio(&self) -> &AudioBuffer {
        &self.audio
    }

    /// Format of the audio being recorded, if a device is attached.
    #[must_use]
    pub const fn audio_format(&self) -> Option<AudioFormat> {
        self.audio_format
    }

    /// Records the format of the attached audio device for this session.
    pub fn set_audio_format(&mut self, format: Option<AudioFormat>) {
        self.audio_format = format;
    }

    /// Clears every channel and the audio, then starts recording.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidState`] if already recording; nothing
    /// is cleared in that case.
    pub fn start(&mut self) -> Result<()> {
        self.require(SessionState::Idle, "start")?;
        self.clear();
        self.state = SessionState::Recording;
        info!("capture session started");
        Ok(())
    }

    /// Appends an accelerometer sample.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidState`] while idle.
    pub fn record_accelerometer(&mut self, timestamp: Timestamp, value: Vector3) -> Result<()> {
        self.require(SessionState::Recording, "record accelerometer")?;
        self.accelerometer.push(timestamp, value);
        Ok(())
    }

    /// Appends a rotation-vector sample and its derived samples.
    ///
    /// Always derives a gravity sample. Derives a linear-acceleration sample
    /// from the most recent accelerometer value if one exists.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidState`] while idle.
    pub fn record_rotation_vector(&mut self, timestamp: Timestamp, value: Quaternion) -> Result<()> {
        self.require(SessionState::Recording, "record rotation vector")?;
        self.rotation_vector.push(timestamp, value);
        self.gravity
            .push(timestamp, self.decomposer.gravity_in_device_frame(value));

        if let Some(latest) = self.accelerometer.latest() {
            let linear = self.decomposer.linear_acceleration(value, latest.value);
            self.linear_acceleration.push(timestamp, linear);
        }
        Ok(())
    }

    /// Appends a gyroscope sample.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidState`] while idle.
    pub fn record_gyroscope(&mut self, timestamp: Timestamp, value: Vector3) -> Result<()> {
        self.require(SessionState::Recording, "record gyroscope")?;
        self.gyroscope.push(timestamp, value);
        Ok(())
    }

    /// Routes a decoded sensor event to the matching `record_*` method.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidState`] while idle.
    pub fn record_event(&mut self, event: &SensorEvent) -> Result<()> {
        match event.reading {
            SensorReading::Accelerometer(v) => self.record_accelerometer(event.timestamp, v),
            SensorReading::RotationVector(q) => self.record_rotation_vector(event.timestamp, q),
            SensorReading::Gyroscope(v) => self.record_gyroscope(event.timestamp, v),
        }
    }

    /// Appends one audio chunk.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidState`] while idle, or a fusion error
    /// if the chunk has the wrong length.
    pub fn append_audio_chunk(&mut self, samples: &[i16]) -> Result<AudioAppend> {
        self.require(SessionState::Recording, "append audio")?;
        Ok(self.audio.append_chunk(samples)?)
    }

    /// Marks the audio ceiling as reached.
    ///
    /// Returns true only the first time in a session.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidState`] while idle.
    pub fn note_audio_limit(&mut self) -> Result<bool> {
        self.require(SessionState::Recording, "append audio")?;
        Ok(self.audio.mark_limit_reached())
    }

    /// Stops recording and moves everything into a [`Snapshot`].
    ///
    /// The session is left idle and empty, ready for the next `start`.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidState`] while idle; nothing changes.
    pub fn stop(&mut self) -> Result<Snapshot> {
        self.require(SessionState::Recording, "stop")?;
        self.state = SessionState::Idle;

        let audio_chunks = self.audio.chunk_count();
        let snapshot = Snapshot {
            accelerometer: self.accelerometer.take(),
            linear_acceleration: self.linear_acceleration.take(),
            gyroscope: self.gyroscope.take(),
            rotation_vector: self.rotation_vector.take(),
            gravity: self.gravity.take(),
            audio: self.audio.take(),
            audio_chunks,
            audio_format: self.audio_format.take(),
        };

        info!(
            accel = snapshot.accelerometer.len(),
            rotvec = snapshot.rotation_vector.len(),
            laccel = snapshot.linear_acceleration.len(),
            audio_chunks,
            "capture session stopped"
        );
        Ok(snapshot)
    }

    fn require(&self, expected: SessionState, operation: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            debug!(operation, state = %self.state, "rejected in current state");
            Err(CaptureError::invalid_state(operation, self.state))
        }
    }

    fn clear(&mut self) {
        self.accelerometer.clear();
        self.linear_acceleration.clear();
        self.gyroscope.clear();
        self.rotation_vector.clear();
        self.gravity.clear();
        self.audio.clear();
    }
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

    fn ts(nanos: i64) -> Timestamp {
        Timestamp::from_nanos(nanos)
    }

    fn recording() -> SessionBuffer {
        let mut session = SessionBuffer::default();
        session.start().unwrap();
        session
    }

    #[test]
    fn starts_idle() {
        let session = SessionBuffer::default();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.is_recording());
    }

    #[test]
    fn accelerometer_only_session() {
        let mut session = recording();
        for i in 0..10 {
            session
                .record_accelerometer(ts(i), Vector3::new(i as f32, 0.0, 0.0))
                .unwrap();
        }

        let snapshot = session.stop().unwrap();
        assert_eq!(snapshot.accelerometer.len(), 10);
        for (i, sample) in snapshot.accelerometer.iter().enumerate() {
            assert_eq!(sample.timestamp, ts(i as i64));
            assert_eq!(sample.value.x, i as f32);
        }
        for kind in [
            ChannelKind::LinearAcceleration,
            ChannelKind::Gyroscope,
            ChannelKind::RotationVector,
            ChannelKind::Gravity,
        ] {
            assert_eq!(snapshot.channel_len(kind), 0, "{kind}");
        }
    }

    #[test]
    fn rotation_without_accel_derives_gravity_only() {
        let mut session = recording();
        session.record_rotation_vector(ts(1), Quaternion::IDENTITY).unwrap();

        assert_eq!(session.channel_len(ChannelKind::RotationVector), 1);
        assert_eq!(session.channel_len(ChannelKind::Gravity), 1);
        assert_eq!(session.channel_len(ChannelKind::LinearAcceleration), 0);
    }

    #[test]
    fn every_rotation_after_accel_derives_linear() {
        let mut session = recording();
        session.record_rotation_vector(ts(1), Quaternion::IDENTITY).unwrap();
        session
            .record_accelerometer(ts(2), Vector3::new(0.0, 0.0, 9.798))
            .unwrap();
        for i in 3..8 {
            session.record_rotation_vector(ts(i), Quaternion::IDENTITY).unwrap();
        }

        let snapshot = session.stop().unwrap();
        assert_eq!(snapshot.rotation_vector.len(), 6);
        assert_eq!(snapshot.gravity.len(), 6);
        assert_eq!(snapshot.linear_acceleration.len(), 5);
        // Paired with the rotation timestamp, not the accelerometer's.
        let stamps: Vec<i64> = snapshot
            .linear_acceleration
            .iter()
            .map(|s| s.timestamp.as_nanos())
            .collect();
        assert_eq!(stamps, vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn linear_uses_most_recent_accel() {
        let mut session = recording();
        session.record_accelerometer(ts(1), Vector3::new(5.0, 0.0, 9.798)).unwrap();
        session.record_accelerometer(ts(2), Vector3::new(1.0, 0.0, 9.798)).unwrap();
        session.record_rotation_vector(ts(3), Quaternion::IDENTITY).unwrap();

        let snapshot = session.stop().unwrap();
        assert_eq!(snapshot.linear_acceleration[0].value, Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn level_stationary_end_to_end() {
        let mut session = recording();
        session.record_rotation_vector(ts(1), Quaternion::IDENTITY).unwrap();
        session
            .record_accelerometer(ts(2), Vector3::new(0.0, 0.0, 9.798))
            .unwrap();
        session.record_rotation_vector(ts(3), Quaternion::IDENTITY).unwrap();

        let snapshot = session.stop().unwrap();
        assert_eq!(snapshot.linear_acceleration.len(), 1);
        assert_relative_eq!(snapshot.linear_acceleration[0].value.length(), 0.0, epsilon = 1e-6);
        assert_eq!(snapshot.gravity[0].value, Vector3::new(0.0, 0.0, 9.798));
    }

    #[test]
    fn gyroscope_channel() {
        let mut session = recording();
        session.record_gyroscope(ts(1), Vector3::X).unwrap();
        let snapshot = session.stop().unwrap();
        assert_eq!(snapshot.gyroscope.len(), 1);
    }

    #[test]
    fn record_event_routes_by_kind() {
        let mut session = recording();
        session
            .record_event(&SensorEvent::accelerometer(ts(1), Vector3::Z))
            .unwrap();
        session
            .record_event(&SensorEvent::rotation_vector(ts(2), Quaternion::IDENTITY))
            .unwrap();
        session
            .record_event(&SensorEvent::gyroscope(ts(3), Vector3::Y))
            .unwrap();

        assert_eq!(session.channel_len(ChannelKind::Accelerometer), 1);
        assert_eq!(session.channel_len(ChannelKind::RotationVector), 1);
        assert_eq!(session.channel_len(ChannelKind::Gyroscope), 1);
        assert_eq!(session.channel_len(ChannelKind::LinearAcceleration), 1);
    }

    #[test]
    fn recording_while_idle_is_rejected() {
        let mut session = SessionBuffer::default();
        let err = session.record_accelerometer(ts(1), Vector3::Z).unwrap_err();
        assert!(err.is_invalid_state());
        assert!(session.record_rotation_vector(ts(1), Quaternion::IDENTITY).is_err());
        assert!(session.record_gyroscope(ts(1), Vector3::Z).is_err());
        assert!(session.append_audio_chunk(&[0; 1024]).is_err());
        assert!(session.note_audio_limit().is_err());
        assert_eq!(session.channel_len(ChannelKind::Accelerometer), 0);
    }

    #[test]
    fn start_while_recording_keeps_data() {
        let mut session = recording();
        session.record_accelerometer(ts(1), Vector3::Z).unwrap();

        let err = session.start().unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(session.channel_len(ChannelKind::Accelerometer), 1);
        assert!(session.is_recording());
    }

    #[test]
    fn stop_while_idle_is_rejected_and_harmless() {
        let mut session = recording();
        session.record_accelerometer(ts(1), Vector3::Z).unwrap();
        session.stop().unwrap();

        let err = session.stop().unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(session.state(), SessionState::Idle);
        for kind in ChannelKind::ALL {
            assert_eq!(session.channel_len(kind), 0);
        }
    }

    #[test]
    fn stop_resets_for_reuse() {
        let mut session = recording();
        session.record_accelerometer(ts(1), Vector3::Z).unwrap();
        session.append_audio_chunk(&[1; 1024]).unwrap();
        let first = session.stop().unwrap();
        assert_eq!(first.audio_chunks, 1);

        session.start().unwrap();
        session.record_accelerometer(ts(2), Vector3::X).unwrap();
        let second = session.stop().unwrap();

        assert_eq!(second.accelerometer.len(), 1);
        assert_eq!(second.accelerometer[0].timestamp, ts(2));
        assert!(second.audio.is_empty());
        // First snapshot is unaffected by the second session.
        assert_eq!(first.accelerometer[0].timestamp, ts(1));
        assert_eq!(first.audio.len(), 1024);
    }

    #[test]
    fn audio_ceiling_reports_once_per_session() {
        let config = CaptureConfig::default().with_chunk_samples(4).with_max_chunks(2);
        let mut session = SessionBuffer::from_config(&config).unwrap();
        session.start().unwrap();

        let outcomes: Vec<AudioAppend> = (0..4)
            .map(|_| session.append_audio_chunk(&[3; 4]).unwrap())
            .collect();
        assert_eq!(
            outcomes,
            vec![
                AudioAppend::Stored,
                AudioAppend::Stored,
                AudioAppend::LimitReached,
                AudioAppend::Dropped
            ]
        );
        assert!(!session.note_audio_limit().unwrap());

        session.stop().unwrap();
        session.start().unwrap();
        assert!(session.note_audio_limit().unwrap());
    }

    #[test]
    fn audio_chunk_size_checked() {
        let mut session = recording();
        let err = session.append_audio_chunk(&[0; 10]).unwrap_err();
        assert!(matches!(err, CaptureError::Fusion(_)));
    }

    #[test]
    fn custom_gravity() {
        let mut config = CaptureConfig::default();
        config.sensors.gravity = 9.81;
        let mut session = SessionBuffer::from_config(&config).unwrap();
        session.start().unwrap();
        session.record_rotation_vector(ts(1), Quaternion::IDENTITY).unwrap();
        let snapshot = session.stop().unwrap();
        assert_relative_eq!(snapshot.gravity[0].value.z, 9.81);
    }

    #[test]
    fn zero_quaternion_propagates_nan() {
        let mut session = recording();
        session.record_accelerometer(ts(1), Vector3::Z).unwrap();
        session
            .record_rotation_vector(ts(2), Quaternion::from_xyzw(0.0, 0.0, 0.0, 0.0))
            .unwrap();
        let snapshot = session.stop().unwrap();
        assert!(snapshot.gravity[0].value.is_nan());
        assert!(snapshot.linear_acceleration[0].value.is_nan());
    }

    #[test]
    fn audio_format_moves_into_snapshot() {
        let mut session = recording();
        session.set_audio_format(Some(AudioFormat::mono(16_000)));
        let snapshot = session.stop().unwrap();
        assert_eq!(snapshot.audio_format, Some(AudioFormat::mono(16_000)));
        assert!(session.audio_format().is_none());
    }
}
