//! End-to-end capture sessions through the controller.
//!
//! Each test wires a controller to an in-memory microphone and a recording
//! sink, then checks what reaches the transport.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use std::fs;
use std::io::{self, Cursor};
use std::sync::{Arc, Mutex};
use std::thread;

use approx::assert_relative_eq;
use crossbeam_channel::{Receiver, unbounded};
use sensor_capture::{
    AudioDevice, AudioDeviceProvider, AudioFormat, CaptureConfig, CaptureController,
    CaptureNotice, CaptureStatus, ChannelSink, DirectorySink, NoAudioDevices, PcmReaderDevice,
    RemoteCommand, SessionState, Snapshot,
};
use sensor_types::{ChannelKind, Quaternion, SensorEvent, Timestamp, Vector3};

// =============================================================================
// Fixtures
// =============================================================================

/// Microphone backed by a byte buffer, available at one sample rate.
struct MemoryMic {
    sample_rate: u32,
    pcm: Mutex<Option<Vec<u8>>>,
}

impl MemoryMic {
    fn new(sample_rate: u32, samples: &[i16]) -> Self {
        Self {
            sample_rate,
            pcm: Mutex::new(Some(samples.iter().flat_map(|s| s.to_le_bytes()).collect())),
        }
    }
}

impl AudioDeviceProvider for MemoryMic {
    fn open(&self, format: AudioFormat) -> Option<Box<dyn AudioDevice>> {
        if format.sample_rate != self.sample_rate {
            return None;
        }
        let pcm = self.pcm.lock().unwrap().take()?;
        Some(Box::new(PcmReaderDevice::new(Cursor::new(pcm), format)))
    }
}

/// Microphone that never runs dry.
struct EndlessMic;

impl AudioDeviceProvider for EndlessMic {
    fn open(&self, format: AudioFormat) -> Option<Box<dyn AudioDevice>> {
        Some(Box::new(PcmReaderDevice::new(io::repeat(0x11), format)))
    }
}

fn ts(nanos: i64) -> Timestamp {
    Timestamp::from_nanos(nanos)
}

fn controller_with(
    config: CaptureConfig,
    provider: Arc<dyn AudioDeviceProvider>,
) -> (CaptureController, Receiver<Snapshot>, Receiver<CaptureNotice>) {
    let (snap_tx, snap_rx) = unbounded();
    let (notice_tx, notice_rx) = unbounded();
    let controller = CaptureController::with_notices(
        config,
        provider,
        Box::new(ChannelSink::new(snap_tx)),
        notice_tx,
    )
    .unwrap();
    (controller, snap_rx, notice_rx)
}

fn wait_for_audio(controller: &mut CaptureController) {
    while controller.audio_active() {
        controller.process_pending();
        thread::yield_now();
    }
    controller.process_pending();
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn level_stationary_device_cancels_gravity() {
    let (controller, snapshots, _notices) =
        controller_with(CaptureConfig::default(), Arc::new(NoAudioDevices));
    let (handle, join) = controller.spawn().unwrap();

    handle.send_command(RemoteCommand::StartSensing).unwrap();
    handle
        .submit(SensorEvent::rotation_vector(ts(10), Quaternion::from_xyzw(0.0, 0.0, 0.0, 1.0)))
        .unwrap();
    handle
        .submit(SensorEvent::accelerometer(ts(20), Vector3::new(0.0, 0.0, 9.798)))
        .unwrap();
    handle
        .submit(SensorEvent::rotation_vector(ts(30), Quaternion::from_xyzw(0.0, 0.0, 0.0, 1.0)))
        .unwrap();
    handle.send_command(RemoteCommand::StopSensing).unwrap();
    handle.shutdown().unwrap();
    join.join().unwrap();

    let snapshot = snapshots.recv().unwrap();
    assert_eq!(snapshot.channel_len(ChannelKind::RotationVector), 2);
    assert_eq!(snapshot.channel_len(ChannelKind::Gravity), 2);
    assert_eq!(snapshot.channel_len(ChannelKind::LinearAcceleration), 1);

    let linear = snapshot.linear_acceleration[0];
    assert_eq!(linear.timestamp, ts(30));
    assert_relative_eq!(linear.value.length(), 0.0, epsilon = 1e-6);
}

#[test]
fn audio_stops_at_duration_limit_with_one_notice() {
    let config = CaptureConfig::default();
    assert_eq!(config.audio.chunk_samples, 1024);
    assert_eq!(config.audio.max_chunks, 1000);

    let (mut controller, _snapshots, notices) = controller_with(config, Arc::new(EndlessMic));
    controller.start().unwrap();
    wait_for_audio(&mut controller);
    let snapshot = controller.stop().unwrap();

    assert_eq!(snapshot.audio_chunks, 1000);
    assert_eq!(snapshot.audio.len(), 1000 * 1024);
    assert!(snapshot.audio.iter().all(|&s| s == 0x1111));

    let exceeded: Vec<CaptureNotice> = notices
        .try_iter()
        .filter(|n| matches!(n, CaptureNotice::DurationExceeded { .. }))
        .collect();
    assert_eq!(exceeded, vec![CaptureNotice::DurationExceeded { max_chunks: 1000 }]);
}

#[test]
fn short_final_read_is_zero_padded() {
    let config = CaptureConfig::default().with_chunk_samples(4);
    let samples: Vec<i16> = (1..=6).collect();
    let (mut controller, _snapshots, _notices) =
        controller_with(config, Arc::new(MemoryMic::new(8_000, &samples)));

    controller.start().unwrap();
    wait_for_audio(&mut controller);
    let snapshot = controller.stop().unwrap();

    assert_eq!(snapshot.audio_format, Some(AudioFormat::mono(8_000)));
    assert_eq!(snapshot.audio, vec![1, 2, 3, 4, 5, 6, 0, 0]);
    assert_eq!(&snapshot.audio_bytes()[..4], &[1_u8, 0, 2, 0]);
}

#[test]
fn second_session_starts_empty() {
    let (mut controller, _snapshots, _notices) =
        controller_with(CaptureConfig::default(), Arc::new(NoAudioDevices));

    controller.start().unwrap();
    for i in 0..5 {
        controller
            .handle_event(SensorEvent::accelerometer(ts(i), Vector3::Z).into())
            .unwrap();
    }
    let first = controller.stop().unwrap();

    controller.start().unwrap();
    controller
        .handle_event(SensorEvent::accelerometer(ts(100), Vector3::X).into())
        .unwrap();
    let second = controller.stop().unwrap();

    assert_eq!(first.accelerometer.len(), 5);
    assert_eq!(second.accelerometer.len(), 1);
    assert_eq!(second.accelerometer[0].timestamp, ts(100));
    assert_eq!(controller.state(), SessionState::Idle);
}

#[test]
fn rejected_operations_leave_session_untouched() {
    let (mut controller, _snapshots, _notices) =
        controller_with(CaptureConfig::default(), Arc::new(NoAudioDevices));

    assert!(controller.stop().unwrap_err().is_invalid_state());
    assert!(
        controller
            .handle_event(SensorEvent::accelerometer(ts(1), Vector3::Z).into())
            .unwrap_err()
            .is_invalid_state()
    );

    controller.start().unwrap();
    controller
        .handle_event(SensorEvent::accelerometer(ts(2), Vector3::Z).into())
        .unwrap();
    assert!(controller.start().unwrap_err().is_invalid_state());

    let snapshot = controller.stop().unwrap();
    assert_eq!(snapshot.accelerometer.len(), 1);
    assert_eq!(snapshot.accelerometer[0].timestamp, ts(2));
}

#[test]
fn bundle_written_to_directory() {
    let dir = tempfile::tempdir().unwrap();
    let config = CaptureConfig::default()
        .with_chunk_samples(2)
        .with_gyroscope(true);
    let (notice_tx, notices) = unbounded();
    let mut controller = CaptureController::with_notices(
        config,
        Arc::new(MemoryMic::new(48_000, &[7, -7, 7, -7])),
        Box::new(DirectorySink::new(dir.path(), true)),
        notice_tx,
    )
    .unwrap();

    controller.start().unwrap();
    controller
        .handle_event(SensorEvent::accelerometer(ts(1), Vector3::new(0.0, 0.0, 9.798)).into())
        .unwrap();
    controller
        .handle_event(SensorEvent::gyroscope(ts(2), Vector3::new(0.5, 0.0, 0.0)).into())
        .unwrap();
    controller
        .handle_event(SensorEvent::rotation_vector(ts(3), Quaternion::IDENTITY).into())
        .unwrap();
    wait_for_audio(&mut controller);
    let summary = controller.stop_and_dispatch().unwrap();
    drop(controller);

    assert_eq!(summary.audio_chunks, 2);
    assert_eq!(summary.sample_rate, Some(48_000));

    let session = dir.path().join("session-0000");
    let accel = fs::read_to_string(session.join("sensor.accel")).unwrap();
    assert_eq!(accel, "1\t0.0\t0.0\t9.798\n");
    let rotvec = fs::read_to_string(session.join("sensor.rotvec")).unwrap();
    assert_eq!(rotvec, "3\t0.0\t0.0\t0.0\t1.0\n");
    let gyro = fs::read_to_string(session.join("sensor.gyro")).unwrap();
    assert_eq!(gyro, "2\t0.5\t0.0\t0.0\n");
    assert_eq!(fs::read(session.join("record")).unwrap().len(), 8);

    let wav = hound::WavReader::open(session.join("record.wav")).unwrap();
    assert_eq!(wav.spec().sample_rate, 48_000);
    assert_eq!(wav.len(), 4);

    let delivered: Vec<CaptureNotice> = notices.try_iter().collect();
    assert!(
        delivered
            .iter()
            .any(|n| matches!(n, CaptureNotice::Delivered(s) if s.gravity == 1))
    );
    assert_eq!(
        delivered.last(),
        Some(&CaptureNotice::Status(CaptureStatus::Stopped))
    );
}

#[test]
fn config_file_drives_controller() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.toml");
    fs::write(
        &path,
        r#"
queue_capacity = 64

[audio]
chunk_samples = 8
max_chunks = 3
sample_rates = [16000]

[sensors]
gravity = 9.81
"#,
    )
    .unwrap();
    let config = CaptureConfig::from_toml_str(&fs::read_to_string(&path).unwrap()).unwrap();

    let (mut controller, _snapshots, _notices) = controller_with(config, Arc::new(EndlessMic));
    controller.start().unwrap();
    controller
        .handle_event(SensorEvent::rotation_vector(ts(1), Quaternion::IDENTITY).into())
        .unwrap();
    wait_for_audio(&mut controller);
    let snapshot = controller.stop().unwrap();

    assert_eq!(snapshot.audio_chunks, 3);
    assert_eq!(snapshot.audio_format.map(|f| f.sample_rate), Some(16_000));
    assert_eq!(snapshot.gravity[0].value, Vector3::new(0.0, 0.0, 9.81));
}
