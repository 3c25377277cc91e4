//! Microphone capture: device abstraction, format probing and the worker thread.
//!
//! Hardware access is behind [`AudioDevice`] and [`AudioDeviceProvider`];
//! this module only decides which format to open and runs the blocking
//! read loop that feeds chunks to the controller.

use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::config::AudioConfig;
use crate::error::{CaptureError, Result};
use crate::event::CaptureEvent;

/// Sample encoding of captured audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SampleEncoding {
    /// Signed 16-bit little-endian PCM.
    #[default]
    Pcm16,
}

/// Parameters an audio device was opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Samples per second.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
    /// Sample encoding.
    pub encoding: SampleEncoding,
}

impl AudioFormat {
    /// Mono 16-bit PCM at `sample_rate`.
    #[must_use]
    pub const fn mono(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
            encoding: SampleEncoding::Pcm16,
        }
    }

    /// Candidate formats in probing order.
    #[must_use]
    pub fn candidates(config: &AudioConfig) -> Vec<Self> {
        config
            .sample_rates
            .iter()
            .map(|&sample_rate| Self {
                sample_rate,
                channels: config.channels,
                encoding: SampleEncoding::Pcm16,
            })
            .collect()
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz, {} ch, pcm16", self.sample_rate, self.channels)
    }
}

/// An opened microphone.
pub trait AudioDevice: Send {
    /// Format the device was opened with.
    fn format(&self) -> AudioFormat;

    /// Begins capturing.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Device`] if capture cannot begin.
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Blocks until samples are available and copies them into `buf`.
    ///
    /// Returns the number of samples written; `0` means the stream ended.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::Device`] if the device fails.
    fn read(&mut self, buf: &mut [i16]) -> Result<usize>;

    /// Stops capturing and releases the device.
    fn stop(&mut self) {}
}

/// Opens audio devices for a requested format.
pub trait AudioDeviceProvider: Send + Sync {
    /// Tries to open a device with `format`. `None` if unsupported.
    fn open(&self, format: AudioFormat) -> Option<Box<dyn AudioDevice>>;
}

/// Opens the first format in `config.sample_rates` order that the provider accepts.
///
/// # Errors
///
/// Returns [`CaptureError::CaptureDeviceUnavailable`] if no candidate opens.
pub fn open_first_available(
    provider: &dyn AudioDeviceProvider,
    config: &AudioConfig,
) -> Result<Box<dyn AudioDevice>> {
    let candidates = AudioFormat::candidates(config);
    for format in &candidates {
        if let Some(device) = provider.open(*format) {
            info!(%format, "opened audio device");
            return Ok(device);
        }
        trace!(%format, "audio format rejected");
    }
    warn!(tried = candidates.len(), "no audio format could be opened");
    Err(CaptureError::CaptureDeviceUnavailable {
        tried: candidates.len(),
    })
}

/// Provider with no microphone, for sensor-only capture.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAudioDevices;

impl AudioDeviceProvider for NoAudioDevices {
    fn open(&self, _format: AudioFormat) -> Option<Box<dyn AudioDevice>> {
        None
    }
}

/// Audio device reading little-endian 16-bit PCM from any byte source.
///
/// Useful for replaying recorded audio. The stream ends at EOF.
pub struct PcmReaderDevice<R> {
    reader: R,
    format: AudioFormat,
    bytes: Vec<u8>,
}

impl<R: Read + Send> PcmReaderDevice<R> {
    /// Wraps `reader`, reporting `format`.
    #[must_use]
    pub const fn new(reader: R, format: AudioFormat) -> Self {
        Self {
            reader,
            format,
            bytes: Vec::new(),
        }
    }
}

impl<R> fmt::Debug for PcmReaderDevice<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcmReaderDevice")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl<R: Read + Send> AudioDevice for PcmReaderDevice<R> {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read(&mut self, buf: &mut [i16]) -> Result<usize> {
        self.bytes.resize(buf.len() * 2, 0);
        let mut filled = 0;
        while filled < self.bytes.len() {
            match self.reader.read(&mut self.bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(CaptureError::device(e.to_string())),
            }
        }

        // A trailing odd byte is not a sample.
        let samples = filled / 2;
        for (dst, pair) in buf.iter_mut().zip(self.bytes[..samples * 2].chunks_exact(2)) {
            *dst = i16::from_le_bytes([pair[0], pair[1]]);
        }
        Ok(samples)
    }
}

/// Why the audio worker stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// Cancelled by the controller.
    Cancelled,
    /// Reached the chunk ceiling.
    LimitReached,
    /// The device reported end of stream.
    EndOfStream,
    /// The controller stopped receiving.
    Disconnected,
    /// The device failed.
    DeviceError,
}

/// Background thread reading fixed-size chunks from an [`AudioDevice`].
///
/// The thread keeps reading while its playing flag is set and it has read
/// fewer than `max_chunks` chunks. A short read leaves the remainder of the
/// chunk zeroed. Each chunk is sent as [`CaptureEvent::Audio`]; reaching the
/// ceiling sends [`CaptureEvent::AudioLimitReached`] once and ends the thread.
#[derive(Debug)]
pub struct AudioWorker {
    playing: Arc<AtomicBool>,
    handle: Option<JoinHandle<WorkerExit>>,
}

impl AudioWorker {
    /// Starts `device` and spawns the read loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot start or the thread cannot spawn.
    pub fn spawn(
        mut device: Box<dyn AudioDevice>,
        chunk_samples: usize,
        max_chunks: usize,
        events: Sender<CaptureEvent>,
    ) -> Result<Self> {
        device.start()?;
        let playing = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&playing);

        let handle = thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || {
                let exit = read_loop(device.as_mut(), chunk_samples, max_chunks, &flag, &events);
                device.stop();
                debug!(?exit, "audio worker exited");
                exit
            })?;

        Ok(Self {
            playing,
            handle: Some(handle),
        })
    }

    /// Asks the loop to stop after its current read.
    pub fn cancel(&self) {
        self.playing.store(false, Ordering::Release);
    }

    /// Returns true once the thread has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Cancels and waits for the thread.
    ///
    /// Returns `None` if the thread panicked or was already joined.
    pub fn join(mut self) -> Option<WorkerExit> {
        self.cancel();
        self.handle.take().and_then(|h| h.join().ok())
    }
}

impl Drop for AudioWorker {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn read_loop(
    device: &mut dyn AudioDevice,
    chunk_samples: usize,
    max_chunks: usize,
    playing: &AtomicBool,
    events: &Sender<CaptureEvent>,
) -> WorkerExit {
    let mut chunks = 0;
    while playing.load(Ordering::Acquire) {
        if chunks >= max_chunks {
            if events.send(CaptureEvent::AudioLimitReached).is_err() {
                return WorkerExit::Disconnected;
            }
            return WorkerExit::LimitReached;
        }

        let mut chunk = vec![0_i16; chunk_samples];
        match device.read(&mut chunk) {
            Ok(0) => return WorkerExit::EndOfStream,
            Ok(n) => {
                if n < chunk_samples {
                    trace!(n, chunk_samples, "short audio read");
                }
            }
            Err(e) => {
                warn!(error = %e, "audio read failed");
                return WorkerExit::DeviceError;
            }
        }

        if events.send(CaptureEvent::Audio(chunk)).is_err() {
            return WorkerExit::Disconnected;
        }
        chunks += 1;
    }
    WorkerExit::Cancelled
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
    use std::io::Cursor;
    use std::sync::Mutex;

    use crossbeam_channel::unbounded;

    /// Provider that accepts only listed sample rates and records each probe.
    struct FakeProvider {
        accepted: Vec<u32>,
        probed: Mutex<Vec<u32>>,
    }

    impl AudioDeviceProvider for FakeProvider {
        fn open(&self, format: AudioFormat) -> Option<Box<dyn AudioDevice>> {
            self.probed.lock().unwrap().push(format.sample_rate);
            self.accepted
                .contains(&format.sample_rate)
                .then(|| Box::new(PcmReaderDevice::new(io::empty(), format)) as Box<dyn AudioDevice>)
        }
    }

    fn pcm(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn probes_in_configured_order() {
        let provider = FakeProvider {
            accepted: vec![22_050, 16_000],
            probed: Mutex::new(Vec::new()),
        };
        let device = open_first_available(&provider, &AudioConfig::default()).unwrap();

        assert_eq!(device.format().sample_rate, 22_050);
        assert_eq!(*provider.probed.lock().unwrap(), vec![48_000, 44_100, 22_050]);
    }

    #[test]
    fn no_device_is_unavailable() {
        let err = open_first_available(&NoAudioDevices, &AudioConfig::default()).err().unwrap();
        assert!(matches!(err, CaptureError::CaptureDeviceUnavailable { tried: 6 }));
    }

    #[test]
    fn pcm_reader_decodes_little_endian() {
        let mut device = PcmReaderDevice::new(Cursor::new(pcm(&[1, -2, 300])), AudioFormat::mono(8_000));
        let mut buf = [0_i16; 2];
        assert_eq!(device.read(&mut buf).unwrap(), 2);
        assert_eq!(buf, [1, -2]);

        let mut buf = [7_i16; 2];
        assert_eq!(device.read(&mut buf).unwrap(), 1);
        assert_eq!(buf[0], 300);

        assert_eq!(device.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn worker_zero_fills_short_read() {
        let (tx, rx) = unbounded();
        let device = PcmReaderDevice::new(Cursor::new(pcm(&[5, 6, 7, 8, 9])), AudioFormat::mono(8_000));
        let worker = AudioWorker::spawn(Box::new(device), 4, 10, tx).unwrap();
        while !worker.is_finished() {
            thread::yield_now();
        }

        assert_eq!(worker.join(), Some(WorkerExit::EndOfStream));
        let chunks: Vec<Vec<i16>> = rx
            .try_iter()
            .filter_map(|e| match e {
                CaptureEvent::Audio(c) => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(chunks, vec![vec![5, 6, 7, 8], vec![9, 0, 0, 0]]);
    }

    #[test]
    fn worker_stops_at_ceiling() {
        let (tx, rx) = unbounded();
        let device = PcmReaderDevice::new(io::repeat(1), AudioFormat::mono(8_000));
        let worker = AudioWorker::spawn(Box::new(device), 8, 3, tx).unwrap();

        let events: Vec<CaptureEvent> = rx.iter().take(4).collect();
        assert_eq!(events.len(), 4);
        assert!(events[..3].iter().all(|e| matches!(e, CaptureEvent::Audio(c) if c.len() == 8)));
        assert_eq!(events[3], CaptureEvent::AudioLimitReached);

        assert_eq!(worker.join(), Some(WorkerExit::LimitReached));
    }

    #[test]
    fn worker_cancel_ends_endless_stream() {
        let (tx, rx) = unbounded();
        let device = PcmReaderDevice::new(io::repeat(0), AudioFormat::mono(8_000));
        let worker = AudioWorker::spawn(Box::new(device), 16, usize::MAX, tx).unwrap();

        // Wait for at least one chunk so the loop is running.
        let first = rx.recv().unwrap();
        assert!(matches!(first, CaptureEvent::Audio(_)));

        assert_eq!(worker.join(), Some(WorkerExit::Cancelled));
    }

    #[test]
    fn worker_exits_when_receiver_dropped() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        drop(rx);
        let device = PcmReaderDevice::new(io::repeat(0), AudioFormat::mono(8_000));
        let worker = AudioWorker::spawn(Box::new(device), 16, usize::MAX, tx).unwrap();

        while !worker.is_finished() {
            thread::yield_now();
        }
        assert_eq!(worker.join(), Some(WorkerExit::Disconnected));
    }

    #[test]
    fn limit_notice_to_dropped_receiver_is_disconnect() {
        let (tx, rx) = unbounded();
        drop(rx);
        let device = PcmReaderDevice::new(io::repeat(0), AudioFormat::mono(8_000));
        let worker = AudioWorker::spawn(Box::new(device), 16, 0, tx).unwrap();

        while !worker.is_finished() {
            thread::yield_now();
        }
        assert_eq!(worker.join(), Some(WorkerExit::Disconnected));
    }

    #[test]
    fn format_display_and_candidates() {
        assert_eq!(AudioFormat::mono(44_100).to_string(), "44100 Hz, 1 ch, pcm16");
        let candidates = AudioFormat::candidates(&AudioConfig::default());
        assert_eq!(candidates.len(), 6);
        assert_eq!(candidates[5], AudioFormat::mono(16_000));
    }
}
