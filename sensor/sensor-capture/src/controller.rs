//! Capture session controller: owns the session and serializes every write.
//!
//! Producers never touch the [`SessionBuffer`]. They hold a [`CaptureHandle`]
//! and push [`CaptureEvent`]s into one bounded queue; the controller applies
//! them in order on a single thread. `stop` joins the audio worker and
//! drains whatever data is already queued before it snapshots, so a snapshot
//! never misses a chunk that was read during the session.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use sensor_fusion::AudioAppend;
use sensor_types::{SensorEvent, SensorReading};
use tracing::{debug, info, trace, warn};

use crate::command::RemoteCommand;
use crate::config::CaptureConfig;
use crate::error::{CaptureError, Result};
use crate::event::{CaptureEvent, CaptureNotice, CaptureStatus};
use crate::recorder::{AudioDeviceProvider, AudioWorker, open_first_available};
use crate::session::{SessionBuffer, SessionState};
use crate::snapshot::{Snapshot, SnapshotSummary};
use crate::transport::{SnapshotDispatcher, SnapshotSink};

/// How long `stop` waits on the queue between worker liveness checks.
const DRAIN_POLL: Duration = Duration::from_millis(5);

/// Cloneable producer side of a controller's event queue.
#[derive(Debug, Clone)]
pub struct CaptureHandle {
    tx: Sender<CaptureEvent>,
}

impl CaptureHandle {
    /// Enqueues an event, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::QueueClosed`] if the controller is gone.
    pub fn submit(&self, event: impl Into<CaptureEvent>) -> Result<()> {
        self.tx
            .send(event.into())
            .map_err(|_| CaptureError::QueueClosed)
    }

    /// Enqueues an event without blocking.
    ///
    /// Suited to sensor callbacks, which must not stall.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::QueueFull`] or [`CaptureError::QueueClosed`].
    pub fn try_submit(&self, event: impl Into<CaptureEvent>) -> Result<()> {
        self.tx.try_send(event.into()).map_err(|e| match e {
            TrySendError::Full(_) => CaptureError::QueueFull,
            TrySendError::Disconnected(_) => CaptureError::QueueClosed,
        })
    }

    /// Enqueues a remote command.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::QueueClosed`] if the controller is gone.
    pub fn send_command(&self, command: RemoteCommand) -> Result<()> {
        self.submit(command)
    }

    /// Parses a remote message path and enqueues the command.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::UnknownCommand`] for an unrecognized path.
    pub fn send_path(&self, path: &str) -> Result<()> {
        self.send_command(path.parse()?)
    }

    /// Asks the event loop to finish the running session and exit.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::QueueClosed`] if the controller is gone.
    pub fn shutdown(&self) -> Result<()> {
        self.submit(CaptureEvent::Shutdown)
    }
}

/// Drives capture sessions from remote commands and producer events.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
///
/// use crossbeam_channel::unbounded;
/// use sensor_capture::{CaptureConfig, CaptureController, ChannelSink, NoAudioDevices};
/// use sensor_types::{ChannelKind, Quaternion, SensorEvent, Timestamp, Vector3};
///
/// let (snapshots_tx, snapshots_rx) = unbounded();
/// let mut controller = CaptureController::new(
///     CaptureConfig::default(),
///     Arc::new(NoAudioDevices),
///     Box::new(ChannelSink::new(snapshots_tx)),
/// )
/// .unwrap();
///
/// controller.start().unwrap();
/// controller
///     .handle_event(SensorEvent::accelerometer(Timestamp::from_nanos(1), Vector3::new(0.0, 0.0, 9.798)).into())
///     .unwrap();
/// controller
///     .handle_event(SensorEvent::rotation_vector(Timestamp::from_nanos(2), Quaternion::IDENTITY).into())
///     .unwrap();
/// controller.stop_and_dispatch().unwrap();
///
/// let snapshot = snapshots_rx.recv().unwrap();
/// assert_eq!(snapshot.channel_len(ChannelKind::LinearAcceleration), 1);
/// ```
pub struct CaptureController {
    config: CaptureConfig,
    session: SessionBuffer,
    provider: Arc<dyn AudioDeviceProvider>,
    dispatcher: SnapshotDispatcher,
    notices: Option<Sender<CaptureNotice>>,
    tx: Sender<CaptureEvent>,
    rx: Receiver<CaptureEvent>,
    worker: Option<AudioWorker>,
    deferred: VecDeque<CaptureEvent>,
}

impl std::fmt::Debug for CaptureController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureController")
            .field("state", &self.session.state())
            .field("worker", &self.worker)
            .field("queued", &self.rx.len())
            .finish_non_exhaustive()
    }
}

impl CaptureController {
    /// Creates an idle controller without a notice channel.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid or the dispatch thread
    /// cannot be spawned.
    pub fn new(
        config: CaptureConfig,
        provider: Arc<dyn AudioDeviceProvider>,
        sink: Box<dyn SnapshotSink>,
    ) -> Result<Self> {
        Self::build(config, provider, sink, None)
    }

    /// Creates an idle controller that publishes [`CaptureNotice`]s to `notices`.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid or the dispatch thread
    /// cannot be spawned.
    pub fn with_notices(
        config: CaptureConfig,
        provider: Arc<dyn AudioDeviceProvider>,
        sink: Box<dyn SnapshotSink>,
        notices: Sender<CaptureNotice>,
    ) -> Result<Self> {
        Self::build(config, provider, sink, Some(notices))
    }

    fn build(
        config: CaptureConfig,
        provider: Arc<dyn AudioDeviceProvider>,
        sink: Box<dyn SnapshotSink>,
        notices: Option<Sender<CaptureNotice>>,
    ) -> Result<Self> {
        config.validate()?;
        let session = SessionBuffer::from_config(&config)?;
        let dispatcher = SnapshotDispatcher::spawn(sink, notices.clone())?;
        let (tx, rx) = bounded(config.queue_capacity);

        Ok(Self {
            config,
            session,
            provider,
            dispatcher,
            notices,
            tx,
            rx,
            worker: None,
            deferred: VecDeque::new(),
        })
    }

    /// Returns a producer handle for this controller's queue.
    #[must_use]
    pub fn handle(&self) -> CaptureHandle {
        CaptureHandle {
            tx: self.tx.clone(),
        }
    }

    /// Current session state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.session.state()
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// The live session.
    #[must_use]
    pub const fn session(&self) -> &SessionBuffer {
        &self.session
    }

    /// Returns true while the audio worker is still reading.
    #[must_use]
    pub fn audio_active(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Starts a session and, if a microphone opens, the audio worker.
    ///
    /// When no audio format opens the session records sensors only and a
    /// [`CaptureNotice::DeviceUnavailable`] is published, unless
    /// `audio.require_device` is set, in which case nothing starts.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidState`] if already recording, or
    /// [`CaptureError::CaptureDeviceUnavailable`] when a device is required.
    pub fn start(&mut self) -> Result<()> {
        if self.session.is_recording() {
            return Err(CaptureError::invalid_state("start", self.session.state()));
        }

        let device = match open_first_available(self.provider.as_ref(), &self.config.audio) {
            Ok(device) => Some(device),
            Err(e @ CaptureError::CaptureDeviceUnavailable { .. }) => {
                self.notify(CaptureNotice::DeviceUnavailable);
                if self.config.audio.require_device {
                    return Err(e);
                }
                warn!("recording without audio");
                None
            }
            Err(e) => return Err(e),
        };

        self.session.start()?;
        self.session.set_audio_format(device.as_ref().map(|d| d.format()));

        if let Some(device) = device {
            let spawned = AudioWorker::spawn(
                device,
                self.config.audio.chunk_samples,
                self.config.audio.max_chunks,
                self.tx.clone(),
            );
            match spawned {
                Ok(worker) => self.worker = Some(worker),
                Err(e) => {
                    let _ = self.session.stop();
                    return Err(e);
                }
            }
        }

        self.notify(CaptureNotice::Status(CaptureStatus::Recording));
        Ok(())
    }

    /// Stops the session and returns its snapshot.
    ///
    /// The audio worker is cancelled and joined, and every data event
    /// already queued is applied first. Control events found while draining
    /// are deferred to the event loop.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidState`] while idle.
    pub fn stop(&mut self) -> Result<Snapshot> {
        if !self.session.is_recording() {
            return Err(CaptureError::invalid_state("stop", self.session.state()));
        }

        if let Some(worker) = self.worker.take() {
            worker.cancel();
            // The worker may be blocked on a full queue; keep draining until it exits.
            while !worker.is_finished() {
                match self.rx.recv_timeout(DRAIN_POLL) {
                    Ok(event) => self.absorb(event),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            if let Some(exit) = worker.join() {
                debug!(?exit, "audio worker joined");
            }
        }

        while let Ok(event) = self.rx.try_recv() {
            self.absorb(event);
        }

        let snapshot = self.session.stop()?;
        self.notify(CaptureNotice::Status(CaptureStatus::Sending));
        Ok(snapshot)
    }

    /// Stops the session and hands the snapshot to the transport.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidState`] while idle, or
    /// [`CaptureError::QueueClosed`] if the dispatcher is gone.
    pub fn stop_and_dispatch(&mut self) -> Result<SnapshotSummary> {
        let snapshot = self.stop()?;
        let summary = snapshot.summary();
        self.dispatcher.dispatch(snapshot)?;
        info!(
            accel = summary.accelerometer,
            rotvec = summary.rotation_vector,
            audio_chunks = summary.audio_chunks,
            "snapshot dispatched"
        );
        Ok(summary)
    }

    /// Applies one event.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::InvalidState`] for data while idle or a
    /// command that does not fit the state. The session is unchanged.
    pub fn handle_event(&mut self, event: CaptureEvent) -> Result<()> {
        match event {
            CaptureEvent::Sensor(sensor) => self.record_sensor(sensor),
            CaptureEvent::Audio(chunk) => {
                if self.session.append_audio_chunk(&chunk)? == AudioAppend::LimitReached {
                    self.notify_duration_exceeded();
                }
                Ok(())
            }
            CaptureEvent::AudioLimitReached => {
                if self.session.note_audio_limit()? {
                    self.notify_duration_exceeded();
                }
                Ok(())
            }
            CaptureEvent::Command(RemoteCommand::StartSensing) => self.start(),
            CaptureEvent::Command(RemoteCommand::StopSensing) => {
                self.stop_and_dispatch().map(|_| ())
            }
            CaptureEvent::Shutdown => {
                if self.session.is_recording() {
                    self.stop_and_dispatch()?;
                }
                Ok(())
            }
        }
    }

    /// Applies every event currently queued, without blocking.
    ///
    /// Returns the number of events applied. Errors are logged.
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.next_event(false) {
            self.apply_logged(event);
            applied += 1;
        }
        applied
    }

    /// Runs the event loop until [`CaptureEvent::Shutdown`].
    ///
    /// A running session is stopped and dispatched on shutdown, and every
    /// queued snapshot is delivered before this returns.
    pub fn run(mut self) {
        info!("capture controller running");
        while let Some(event) = self.next_event(true) {
            let shutdown = matches!(event, CaptureEvent::Shutdown);
            self.apply_logged(event);
            if shutdown {
                break;
            }
        }
        info!("capture controller stopped");
    }

    /// Moves the controller onto its own thread.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the thread cannot be spawned.
    pub fn spawn(self) -> Result<(CaptureHandle, JoinHandle<()>)> {
        let handle = self.handle();
        let join = thread::Builder::new()
            .name("capture-controller".into())
            .spawn(move || self.run())?;
        Ok((handle, join))
    }

    fn next_event(&mut self, block: bool) -> Option<CaptureEvent> {
        if let Some(event) = self.deferred.pop_front() {
            return Some(event);
        }
        if block {
            self.rx.recv().ok()
        } else {
            self.rx.try_recv().ok()
        }
    }

    fn apply_logged(&mut self, event: CaptureEvent) {
        let is_data = event.is_data();
        if let Err(e) = self.handle_event(event) {
            if is_data && e.is_invalid_state() {
                trace!(error = %e, "data outside a session dropped");
            } else {
                warn!(error = %e, "capture event rejected");
            }
        }
    }

    /// Applies a data event during a stop drain; control events wait.
    fn absorb(&mut self, event: CaptureEvent) {
        if event.is_data() {
            self.apply_logged(event);
        } else {
            self.deferred.push_back(event);
        }
    }

    fn record_sensor(&mut self, event: SensorEvent) -> Result<()> {
        match event.reading {
            SensorReading::Gyroscope(_) if !self.config.sensors.gyroscope => {
                if self.session.is_recording() {
                    trace!("gyroscope disabled, event ignored");
                    Ok(())
                } else {
                    Err(CaptureError::invalid_state(
                        "record gyroscope",
                        self.session.state(),
                    ))
                }
            }
            SensorReading::Accelerometer(raw) => {
                let value = self.config.sensors.accel_calibration.apply(raw);
                self.session.record_accelerometer(event.timestamp, value)
            }
            _ => self.session.record_event(&event),
        }
    }

    fn notify_duration_exceeded(&self) {
        self.notify(CaptureNotice::DurationExceeded {
            max_chunks: self.config.audio.max_chunks,
        });
    }

    fn notify(&self, notice: CaptureNotice) {
        if let Some(notices) = &self.notices {
            let _ = notices.send(notice);
        }
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.cancel();
            // Unblock a worker waiting on a full queue.
            while !worker.is_finished() {
                let _ = self.rx.recv_timeout(DRAIN_POLL);
            }
            let _ = worker.join();
        }
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
    use std::io;

    use approx::assert_relative_eq;
    use crossbeam_channel::unbounded;
    use sensor_types::{ChannelKind, Quaternion, Timestamp, Vector3};

    use crate::config::AccelCalibration;
    use crate::recorder::{AudioDevice, AudioFormat, NoAudioDevices, PcmReaderDevice};
    use crate::transport::ChannelSink;

    /// Opens an endless silent stream at 16 kHz only.
    struct SilentMic;

    impl AudioDeviceProvider for SilentMic {
        fn open(&self, format: AudioFormat) -> Option<Box<dyn AudioDevice>> {
            (format.sample_rate == 16_000)
                .then(|| Box::new(PcmReaderDevice::new(io::repeat(0), format)) as Box<dyn AudioDevice>)
        }
    }

    struct Rig {
        controller: CaptureController,
        snapshots: Receiver<Snapshot>,
        notices: Receiver<CaptureNotice>,
    }

    fn rig(config: CaptureConfig, provider: Arc<dyn AudioDeviceProvider>) -> Rig {
        let (snap_tx, snapshots) = unbounded();
        let (notice_tx, notices) = unbounded();
        let controller = CaptureController::with_notices(
            config,
            provider,
            Box::new(ChannelSink::new(snap_tx)),
            notice_tx,
        )
        .unwrap();
        Rig {
            controller,
            snapshots,
            notices,
        }
    }

    fn ts(nanos: i64) -> Timestamp {
        Timestamp::from_nanos(nanos)
    }

    fn accel(nanos: i64, v: Vector3) -> CaptureEvent {
        SensorEvent::accelerometer(ts(nanos), v).into()
    }

    #[test]
    fn sensor_only_when_no_device() {
        let mut rig = rig(CaptureConfig::default(), Arc::new(NoAudioDevices));
        rig.controller.start().unwrap();

        assert_eq!(rig.controller.state(), SessionState::Recording);
        assert_eq!(rig.notices.recv().unwrap(), CaptureNotice::DeviceUnavailable);
        assert_eq!(
            rig.notices.recv().unwrap(),
            CaptureNotice::Status(CaptureStatus::Recording)
        );

        let snapshot = rig.controller.stop().unwrap();
        assert!(snapshot.audio_format.is_none());
    }

    #[test]
    fn required_device_blocks_start() {
        let config = CaptureConfig::default().with_require_device(true);
        let mut rig = rig(config, Arc::new(NoAudioDevices));

        let err = rig.controller.start().unwrap_err();
        assert!(matches!(err, CaptureError::CaptureDeviceUnavailable { .. }));
        assert_eq!(rig.controller.state(), SessionState::Idle);
    }

    #[test]
    fn start_twice_is_rejected() {
        let mut rig = rig(CaptureConfig::default(), Arc::new(NoAudioDevices));
        rig.controller.start().unwrap();
        assert!(rig.controller.start().unwrap_err().is_invalid_state());
        assert!(rig.controller.session().is_recording());
    }

    #[test]
    fn stop_when_idle_is_rejected() {
        let mut rig = rig(CaptureConfig::default(), Arc::new(NoAudioDevices));
        assert!(rig.controller.stop().unwrap_err().is_invalid_state());
        assert!(rig.controller.stop_and_dispatch().is_err());
    }

    #[test]
    fn data_while_idle_is_rejected() {
        let mut rig = rig(CaptureConfig::default(), Arc::new(NoAudioDevices));
        let err = rig.controller.handle_event(accel(1, Vector3::Z)).unwrap_err();
        assert!(err.is_invalid_state());
        let err = rig
            .controller
            .handle_event(CaptureEvent::Audio(vec![0; 1024]))
            .unwrap_err();
        assert!(err.is_invalid_state());
    }

    #[test]
    fn calibration_applies_to_accelerometer() {
        let config = CaptureConfig::default().with_accel_calibration(AccelCalibration {
            offset: [1.0, 0.0, 0.0],
            scale: [2.0, 1.0, 1.0],
        });
        let mut rig = rig(config, Arc::new(NoAudioDevices));
        rig.controller.start().unwrap();
        rig.controller
            .handle_event(accel(1, Vector3::new(0.5, 0.0, 9.0)))
            .unwrap();

        let snapshot = rig.controller.stop().unwrap();
        assert_eq!(snapshot.accelerometer[0].value, Vector3::new(3.0, 0.0, 9.0));
    }

    #[test]
    fn gyroscope_gated_by_config() {
        let mut disabled = rig(CaptureConfig::default(), Arc::new(NoAudioDevices));
        disabled.controller.start().unwrap();
        disabled
            .controller
            .handle_event(SensorEvent::gyroscope(ts(1), Vector3::X).into())
            .unwrap();
        assert_eq!(disabled.controller.stop().unwrap().gyroscope.len(), 0);

        let mut enabled = rig(
            CaptureConfig::default().with_gyroscope(true),
            Arc::new(NoAudioDevices),
        );
        enabled.controller.start().unwrap();
        enabled
            .controller
            .handle_event(SensorEvent::gyroscope(ts(1), Vector3::X).into())
            .unwrap();
        assert_eq!(enabled.controller.stop().unwrap().gyroscope.len(), 1);
    }

    #[test]
    fn audio_limit_notifies_once() {
        let config = CaptureConfig::default().with_chunk_samples(4).with_max_chunks(1);
        let mut rig = rig(config, Arc::new(NoAudioDevices));
        rig.controller.start().unwrap();
        for _ in 0..3 {
            rig.controller
                .handle_event(CaptureEvent::Audio(vec![1; 4]))
                .unwrap();
        }
        rig.controller
            .handle_event(CaptureEvent::AudioLimitReached)
            .unwrap();

        let exceeded = rig
            .notices
            .try_iter()
            .filter(|n| matches!(n, CaptureNotice::DurationExceeded { .. }))
            .count();
        assert_eq!(exceeded, 1);
        assert_eq!(rig.controller.stop().unwrap().audio_chunks, 1);
    }

    #[test]
    fn stop_collects_worker_audio() {
        let config = CaptureConfig::default()
            .with_chunk_samples(64)
            .with_max_chunks(20)
            .with_queue_capacity(4);
        let mut rig = rig(config, Arc::new(SilentMic));
        rig.controller.start().unwrap();

        // The worker fills the queue; stop must still drain and join it.
        while rig.controller.session().audio().is_empty() {
            rig.controller.process_pending();
            thread::yield_now();
        }
        let snapshot = rig.controller.stop().unwrap();

        assert_eq!(snapshot.audio_format, Some(AudioFormat::mono(16_000)));
        assert!(snapshot.audio_chunks >= 1);
        assert!(snapshot.audio_chunks <= 20);
        assert_eq!(snapshot.audio.len(), snapshot.audio_chunks * 64);
        assert_eq!(rig.controller.state(), SessionState::Idle);
    }

    #[test]
    fn commands_found_while_draining_are_deferred() {
        let mut rig = rig(CaptureConfig::default(), Arc::new(NoAudioDevices));
        let handle = rig.controller.handle();
        rig.controller.start().unwrap();

        handle.submit(accel(1, Vector3::Z)).unwrap();
        handle.send_command(RemoteCommand::StartSensing).unwrap();
        handle.submit(accel(2, Vector3::Z)).unwrap();

        let snapshot = rig.controller.stop().unwrap();
        assert_eq!(snapshot.accelerometer.len(), 2);

        // The deferred start runs on the next pump and opens a new session.
        assert_eq!(rig.controller.process_pending(), 1);
        assert_eq!(rig.controller.state(), SessionState::Recording);
    }

    #[test]
    fn stop_command_dispatches_snapshot() {
        let mut rig = rig(CaptureConfig::default(), Arc::new(NoAudioDevices));
        rig.controller
            .handle_event(RemoteCommand::StartSensing.into())
            .unwrap();
        rig.controller.handle_event(accel(1, Vector3::Z)).unwrap();
        rig.controller
            .handle_event(RemoteCommand::StopSensing.into())
            .unwrap();

        let snapshot = rig.snapshots.recv().unwrap();
        assert_eq!(snapshot.accelerometer.len(), 1);

        let statuses: Vec<CaptureStatus> = rig
            .notices
            .iter()
            .filter_map(|n| match n {
                CaptureNotice::Status(s) => Some(s),
                _ => None,
            })
            .take(3)
            .collect();
        assert_eq!(
            statuses,
            vec![
                CaptureStatus::Recording,
                CaptureStatus::Sending,
                CaptureStatus::Stopped
            ]
        );
    }

    #[test]
    fn event_loop_round_trip() {
        let rig = rig(CaptureConfig::default(), Arc::new(NoAudioDevices));
        let (handle, join) = rig.controller.spawn().unwrap();

        handle.send_path("/start-sensing").unwrap();
        handle
            .submit(SensorEvent::rotation_vector(ts(1), Quaternion::IDENTITY))
            .unwrap();
        handle
            .submit(SensorEvent::accelerometer(ts(2), Vector3::new(0.0, 0.0, 9.798)))
            .unwrap();
        handle
            .submit(SensorEvent::rotation_vector(ts(3), Quaternion::IDENTITY))
            .unwrap();
        handle.send_path("/stop-sensing").unwrap();
        handle.shutdown().unwrap();
        join.join().unwrap();

        let snapshot = rig.snapshots.recv().unwrap();
        assert_eq!(snapshot.channel_len(ChannelKind::LinearAcceleration), 1);
        assert_relative_eq!(snapshot.linear_acceleration[0].value.length(), 0.0, epsilon = 1e-6);
        assert_eq!(snapshot.channel_len(ChannelKind::Gravity), 2);
    }

    #[test]
    fn shutdown_stops_running_session() {
        let rig = rig(CaptureConfig::default(), Arc::new(NoAudioDevices));
        let (handle, join) = rig.controller.spawn().unwrap();

        handle.send_command(RemoteCommand::StartSensing).unwrap();
        handle.submit(accel(1, Vector3::Z)).unwrap();
        handle.shutdown().unwrap();
        join.join().unwrap();

        assert_eq!(rig.snapshots.recv().unwrap().accelerometer.len(), 1);
        assert!(handle.submit(accel(2, Vector3::Z)).is_err());
    }

    #[test]
    fn unknown_path_is_rejected() {
        let rig = rig(CaptureConfig::default(), Arc::new(NoAudioDevices));
        let err = rig.controller.handle().send_path("/reboot").unwrap_err();
        assert!(matches!(err, CaptureError::UnknownCommand(_)));
    }

    #[test]
    fn try_submit_reports_full_queue() {
        let config = CaptureConfig::default().with_queue_capacity(1);
        let rig = rig(config, Arc::new(NoAudioDevices));
        let handle = rig.controller.handle();
        handle.try_submit(accel(1, Vector3::Z)).unwrap();
        let err = handle.try_submit(accel(2, Vector3::Z)).unwrap_err();
        assert!(matches!(err, CaptureError::QueueFull));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = CaptureConfig::default().with_queue_capacity(0);
        let (tx, _rx) = unbounded();
        let result = CaptureController::new(config, Arc::new(NoAudioDevices), Box::new(ChannelSink::new(tx)));
        assert!(matches!(result, Err(CaptureError::Config(_))));
    }
}
