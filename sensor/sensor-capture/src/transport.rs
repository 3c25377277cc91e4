//! Snapshot hand-off to the outbound transport.

use std::fmt;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, unbounded};
use tracing::{info, warn};

use crate::error::{CaptureError, Result};
use crate::event::{CaptureNotice, CaptureStatus};
use crate::snapshot::Snapshot;

/// Receives finished snapshots.
///
/// Implementations may block; they run on the dispatcher's thread.
pub trait SnapshotSink: Send {
    /// Takes ownership of a snapshot and delivers it.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Transport`] (or any other error) if the
    /// snapshot could not be delivered.
    fn deliver(&mut self, snapshot: Snapshot) -> Result<()>;
}

impl<F> SnapshotSink for F
where
    F: FnMut(Snapshot) -> Result<()> + Send,
{
    fn deliver(&mut self, snapshot: Snapshot) -> Result<()> {
        self(snapshot)
    }
}

/// Forwards snapshots into a channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<Snapshot>,
}

impl ChannelSink {
    /// Wraps the sending half of a channel.
    #[must_use]
    pub const fn new(tx: Sender<Snapshot>) -> Self {
        Self { tx }
    }
}

impl SnapshotSink for ChannelSink {
    fn deliver(&mut self, snapshot: Snapshot) -> Result<()> {
        self.tx
            .send(snapshot)
            .map_err(|_| CaptureError::transport("snapshot receiver dropped"))
    }
}

/// Writes each snapshot's asset bundle to a numbered subdirectory.
///
/// Session `n` lands in `<root>/session-<n>` with one file per asset and
/// `record.wav` when audio was captured.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
    include_gyroscope: bool,
    sessions: usize,
}

impl DirectorySink {
    /// Creates a sink rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, include_gyroscope: bool) -> Self {
        Self {
            root: root.into(),
            include_gyroscope,
            sessions: 0,
        }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory used for session `index`.
    #[must_use]
    pub fn session_dir(&self, index: usize) -> PathBuf {
        self.root.join(format!("session-{index:04}"))
    }
}

impl SnapshotSink for DirectorySink {
    fn deliver(&mut self, snapshot: Snapshot) -> Result<()> {
        let dir = self.session_dir(self.sessions);
        let written = snapshot.write_assets(&dir, self.include_gyroscope)?;
        self.sessions += 1;
        info!(dir = %dir.display(), files = written.len(), "snapshot written");
        Ok(())
    }
}

/// Runs a [`SnapshotSink`] on its own thread.
///
/// The controller never waits for the transport: [`dispatch`](Self::dispatch)
/// only enqueues. Each outcome is published as [`CaptureNotice::Delivered`]
/// or [`CaptureNotice::DeliveryFailed`] followed by the
/// [`CaptureStatus::Stopped`] status when a notice channel is attached.
/// Dropping the dispatcher delivers everything already queued, then joins.
pub struct SnapshotDispatcher {
    tx: Option<Sender<Snapshot>>,
    handle: Option<JoinHandle<()>>,
}

impl SnapshotDispatcher {
    /// Spawns the dispatch thread.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the thread cannot be spawned.
    pub fn spawn(
        mut sink: Box<dyn SnapshotSink>,
        notices: Option<Sender<CaptureNotice>>,
    ) -> Result<Self> {
        let (tx, rx) = unbounded::<Snapshot>();
        let handle = thread::Builder::new()
            .name("snapshot-dispatch".into())
            .spawn(move || {
                for snapshot in rx {
                    let summary = snapshot.summary();
                    let notice = match sink.deliver(snapshot) {
                        Ok(()) => CaptureNotice::Delivered(summary),
                        Err(e) => {
                            warn!(error = %e, "snapshot delivery failed");
                            CaptureNotice::DeliveryFailed {
                                reason: e.to_string(),
                            }
                        }
                    };
                    if let Some(notices) = &notices {
                        let _ = notices.send(notice);
                        let _ = notices.send(CaptureNotice::Status(CaptureStatus::Stopped));
                    }
                }
            })?;

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    /// Queues a snapshot for delivery.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::QueueClosed`] if the dispatch thread is gone.
    pub fn dispatch(&self, snapshot: Snapshot) -> Result<()> {
        self.tx
            .as_ref()
            .ok_or(CaptureError::QueueClosed)?
            .send(snapshot)
            .map_err(|_| CaptureError::QueueClosed)
    }
}

impl fmt::Debug for SnapshotDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotDispatcher")
            .field("running", &self.handle.is_some())
            .finish()
    }
}

impl Drop for SnapshotDispatcher {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("snapshot dispatch thread panicked");
            }
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
    use sensor_types::{TimedSample, Timestamp, Vector3};

    fn snapshot_with(n: usize) -> Snapshot {
        Snapshot {
            accelerometer: (0..n)
                .map(|i| TimedSample::new(Timestamp::from_nanos(i as i64), Vector3::Z))
                .collect(),
            ..Snapshot::default()
        }
    }

    #[test]
    fn channel_sink_forwards() {
        let (tx, rx) = unbounded();
        let mut sink = ChannelSink::new(tx);
        sink.deliver(snapshot_with(2)).unwrap();
        assert_eq!(rx.recv().unwrap().accelerometer.len(), 2);
    }

    #[test]
    fn channel_sink_reports_dropped_receiver() {
        let (tx, rx) = unbounded();
        drop(rx);
        let err = ChannelSink::new(tx).deliver(Snapshot::default()).unwrap_err();
        assert!(matches!(err, CaptureError::Transport(_)));
    }

    #[test]
    fn dispatcher_reports_delivery() {
        let (snap_tx, snap_rx) = unbounded();
        let (notice_tx, notice_rx) = unbounded();
        let dispatcher =
            SnapshotDispatcher::spawn(Box::new(ChannelSink::new(snap_tx)), Some(notice_tx)).unwrap();

        dispatcher.dispatch(snapshot_with(3)).unwrap();
        drop(dispatcher);

        assert_eq!(snap_rx.recv().unwrap().accelerometer.len(), 3);
        match notice_rx.recv().unwrap() {
            CaptureNotice::Delivered(summary) => assert_eq!(summary.accelerometer, 3),
            other => panic!("unexpected notice {other:?}"),
        }
        assert_eq!(
            notice_rx.recv().unwrap(),
            CaptureNotice::Status(CaptureStatus::Stopped)
        );
    }

    #[test]
    fn dispatcher_reports_failure() {
        let (notice_tx, notice_rx) = unbounded();
        let sink = |_: Snapshot| -> Result<()> { Err(CaptureError::transport("link down")) };
        let dispatcher = SnapshotDispatcher::spawn(Box::new(sink), Some(notice_tx)).unwrap();

        dispatcher.dispatch(Snapshot::default()).unwrap();
        drop(dispatcher);

        assert_eq!(
            notice_rx.recv().unwrap(),
            CaptureNotice::DeliveryFailed {
                reason: "transport failed: link down".into()
            }
        );
    }

    #[test]
    fn directory_sink_numbers_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectorySink::new(dir.path(), false);
        sink.deliver(snapshot_with(1)).unwrap();
        sink.deliver(snapshot_with(2)).unwrap();

        let second = std::fs::read_to_string(sink.session_dir(1).join("sensor.accel")).unwrap();
        assert_eq!(second.lines().count(), 2);
        assert!(sink.session_dir(0).join("record").exists());
        assert!(!sink.session_dir(0).join("sensor.gyro").exists());
        assert_eq!(sink.root(), dir.path());
    }
}
