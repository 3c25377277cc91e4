//! Finalized session data and its wire rendering.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sensor_types::{ChannelKind, Quaternion, SampleValue, TimedSample, Vector3};
use tracing::debug;

use crate::error::{CaptureError, Result};
use crate::recorder::AudioFormat;

/// Path under which the asset bundle is published.
pub const BUNDLE_PATH: &str = "/sensor";

/// Asset key of the raw audio payload.
pub const AUDIO_ASSET_KEY: &str = "record";

/// Immutable copy of everything recorded in one session.
///
/// Produced once per stop. Ownership moves to the transport.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    /// Raw accelerometer samples.
    pub accelerometer: Vec<TimedSample<Vector3>>,
    /// World-frame, gravity-free acceleration.
    pub linear_acceleration: Vec<TimedSample<Vector3>>,
    /// Angular rate samples.
    pub gyroscope: Vec<TimedSample<Vector3>>,
    /// Orientation samples.
    pub rotation_vector: Vec<TimedSample<Quaternion>>,
    /// Gravity in the device frame.
    pub gravity: Vec<TimedSample<Vector3>>,
    /// 16-bit PCM audio, whole chunks only.
    pub audio: Vec<i16>,
    /// Number of stored audio chunks.
    pub audio_chunks: usize,
    /// Format the audio was captured in, `None` for a sensor-only session.
    pub audio_format: Option<AudioFormat>,
}

impl Snapshot {
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

    /// Returns true if no channel has samples and there is no audio.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.audio.is_empty() && ChannelKind::ALL.iter().all(|&k| self.channel_len(k) == 0)
    }

    /// Renders a channel as UTF-8 text, one sample per line.
    ///
    /// Fields are tab separated in the order `timestamp, x, y, z[, w]`.
    ///
    /// # Example
    ///
    /// ```
    /// use sensor_capture::Snapshot;
    /// use sensor_types::{ChannelKind, TimedSample, Timestamp, Vector3};
    ///
    /// let snapshot = Snapshot {
    ///     accelerometer: vec![TimedSample::new(Timestamp::from_nanos(42), Vector3::new(0.5, 0.0, 9.75))],
    ///     ..Snapshot::default()
    /// };
    /// assert_eq!(snapshot.channel_text(ChannelKind::Accelerometer), "42\t0.5\t0.0\t9.75\n");
    /// ```
    #[must_use]
    pub fn channel_text(&self, kind: ChannelKind) -> String {
        match kind {
            ChannelKind::Accelerometer => render_lines(&self.accelerometer),
            ChannelKind::LinearAcceleration => render_lines(&self.linear_acceleration),
            ChannelKind::Gyroscope => render_lines(&self.gyroscope),
            ChannelKind::RotationVector => render_lines(&self.rotation_vector),
            ChannelKind::Gravity => render_lines(&self.gravity),
        }
    }

    /// Packs the audio as little-endian 16-bit byte pairs.
    #[must_use]
    pub fn audio_bytes(&self) -> Vec<u8> {
        self.audio.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    /// Builds the outbound asset bundle.
    ///
    /// The gyroscope channel is included only when `include_gyroscope` is set.
    #[must_use]
    pub fn to_bundle(&self, include_gyroscope: bool) -> AssetBundle {
        let mut bundle = AssetBundle::new(BUNDLE_PATH);
        for kind in ChannelKind::ALL {
            if kind == ChannelKind::Gyroscope && !include_gyroscope {
                continue;
            }
            bundle.insert(kind.asset_key(), self.channel_text(kind).into_bytes());
        }
        bundle.insert(AUDIO_ASSET_KEY, self.audio_bytes());
        bundle
    }

    /// Per-channel counts and audio length.
    #[must_use]
    pub fn summary(&self) -> SnapshotSummary {
        let sample_rate = self.audio_format.map(|f| f.sample_rate);
        #[allow(clippy::cast_precision_loss)]
        let duration_secs = match self.audio_format {
            Some(f) if f.sample_rate > 0 && f.channels > 0 => {
                self.audio.len() as f64 / (f64::from(f.sample_rate) * f64::from(f.channels))
            }
            _ => 0.0,
        };

        SnapshotSummary {
            accelerometer: self.accelerometer.len(),
            linear_acceleration: self.linear_acceleration.len(),
            gyroscope: self.gyroscope.len(),
            rotation_vector: self.rotation_vector.len(),
            gravity: self.gravity.len(),
            audio_chunks: self.audio_chunks,
            audio_samples: self.audio.len(),
            sample_rate,
            duration_secs,
        }
    }

    /// Writes the audio as a 16-bit PCM WAV file.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::MissingAudioFormat`] for a sensor-only
    /// session, or a WAV error if the file cannot be written.
    pub fn write_wav(&self, path: &Path) -> Result<()> {
        let format = self.audio_format.ok_or(CaptureError::MissingAudioFormat)?;
        let spec = hound::WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.audio {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        debug!(path = %path.display(), samples = self.audio.len(), "wrote wav");
        Ok(())
    }

    /// Writes every asset into `dir`, plus `record.wav` when the format is known.
    ///
    /// Returns the written paths.
    ///
    /// # Errors
    ///
    /// Returns an I/O or WAV error if a file cannot be written.
    pub fn write_assets(&self, dir: &Path, include_gyroscope: bool) -> Result<Vec<PathBuf>> {
        let mut written = self.to_bundle(include_gyroscope).write_to_dir(dir)?;
        if self.audio_format.is_some() {
            let wav = dir.join(format!("{AUDIO_ASSET_KEY}.wav"));
            self.write_wav(&wav)?;
            written.push(wav);
        }
        Ok(written)
    }
}

fn render_lines<T: SampleValue>(samples: &[TimedSample<T>]) -> String {
    let mut out = String::with_capacity(samples.len() * 48);
    for sample in samples {
        let _ = write!(out, "{}", sample.timestamp);
        for component in sample.value.components().as_ref() {
            let _ = write!(out, "\t{component:?}");
        }
        out.push('\n');
    }
    out
}

/// Named byte payloads published together under one path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AssetBundle {
    path: String,
    assets: BTreeMap<String, Vec<u8>>,
}

impl AssetBundle {
    /// Creates an empty bundle.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            assets: BTreeMap::new(),
        }
    }

    /// Publication path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Adds or replaces an asset.
    pub fn insert(&mut self, key: impl Into<String>, bytes: Vec<u8>) {
        self.assets.insert(key.into(), bytes);
    }

    /// Looks up an asset.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.assets.get(key).map(Vec::as_slice)
    }

    /// Asset keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(String::as_str)
    }

    /// Number of assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Returns true if the bundle has no assets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Total payload size in bytes.
    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.assets.values().map(Vec::len).sum()
    }

    /// Writes each asset to `dir/<key>`, creating `dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the directory or a file cannot be written.
    pub fn write_to_dir(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(self.assets.len());
        for (key, bytes) in &self.assets {
            let path = dir.join(key);
            fs::write(&path, bytes)?;
            written.push(path);
        }
        debug!(dir = %dir.display(), assets = written.len(), "wrote asset bundle");
        Ok(written)
    }
}

/// Counts describing a snapshot, for status reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    /// Accelerometer samples.
    pub accelerometer: usize,
    /// Linear-acceleration samples.
    pub linear_acceleration: usize,
    /// Gyroscope samples.
    pub gyroscope: usize,
    /// Rotation-vector samples.
    pub rotation_vector: usize,
    /// Gravity samples.
    pub gravity: usize,
    /// Stored audio chunks.
    pub audio_chunks: usize,
    /// Stored audio samples.
    pub audio_samples: usize,
    /// Capture sample rate, if audio was recorded.
    pub sample_rate: Option<u32>,
    /// Audio length in seconds.
    pub duration_secs: f64,
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
    use sensor_types::Timestamp;

    fn ts(nanos: i64) -> Timestamp {
        Timestamp::from_nanos(nanos)
    }

    fn sample_snapshot() -> Snapshot {
        Snapshot {
            accelerometer: vec![
                TimedSample::new(ts(1), Vector3::new(0.0, 0.0, 9.798)),
                TimedSample::new(ts(2), Vector3::new(1.0, -1.0, 9.5)),
            ],
            rotation_vector: vec![TimedSample::new(ts(3), Quaternion::IDENTITY)],
            gravity: vec![TimedSample::new(ts(3), Vector3::new(0.0, 0.0, 9.798))],
            linear_acceleration: vec![TimedSample::new(ts(3), Vector3::ZERO)],
            gyroscope: vec![TimedSample::new(ts(4), Vector3::new(0.25, 0.0, 0.0))],
            audio: vec![1, -1, 256, 0],
            audio_chunks: 1,
            audio_format: Some(AudioFormat::mono(8_000)),
        }
    }

    #[test]
    fn vector_lines() {
        let text = sample_snapshot().channel_text(ChannelKind::Accelerometer);
        assert_eq!(text, "1\t0.0\t0.0\t9.798\n2\t1.0\t-1.0\t9.5\n");
    }

    #[test]
    fn quaternion_lines_end_with_w() {
        let text = sample_snapshot().channel_text(ChannelKind::RotationVector);
        assert_eq!(text, "3\t0.0\t0.0\t0.0\t1.0\n");
    }

    #[test]
    fn empty_channel_renders_empty() {
        let snapshot = Snapshot::default();
        assert_eq!(snapshot.channel_text(ChannelKind::Gravity), "");
        assert!(snapshot.is_empty());
    }

    #[test]
    fn audio_is_little_endian() {
        let bytes = sample_snapshot().audio_bytes();
        assert_eq!(bytes, vec![0x01, 0x00, 0xff, 0xff, 0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn bundle_keys_without_gyroscope() {
        let bundle = sample_snapshot().to_bundle(false);
        assert_eq!(bundle.path(), "/sensor");
        let keys: Vec<&str> = bundle.keys().collect();
        assert_eq!(
            keys,
            vec!["record", "sensor.accel", "sensor.grav", "sensor.laccel", "sensor.rotvec"]
        );
        assert_eq!(bundle.get("record").unwrap().len(), 8);
    }

    #[test]
    fn bundle_with_gyroscope() {
        let bundle = sample_snapshot().to_bundle(true);
        assert_eq!(bundle.len(), 6);
        assert_eq!(bundle.get("sensor.gyro").unwrap(), b"4\t0.25\t0.0\t0.0\n");
    }

    #[test]
    fn bundle_total_bytes() {
        let mut bundle = AssetBundle::new(BUNDLE_PATH);
        assert!(bundle.is_empty());
        bundle.insert("a", vec![0; 3]);
        bundle.insert("b", vec![0; 4]);
        assert_eq!(bundle.total_bytes(), 7);
    }

    #[test]
    fn summary_counts() {
        let summary = sample_snapshot().summary();
        assert_eq!(summary.accelerometer, 2);
        assert_eq!(summary.rotation_vector, 1);
        assert_eq!(summary.audio_samples, 4);
        assert_eq!(summary.sample_rate, Some(8_000));
        assert_relative_eq!(summary.duration_secs, 4.0 / 8_000.0);

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"audio_chunks\":1"));
    }

    #[test]
    fn summary_without_audio_format() {
        let summary = Snapshot::default().summary();
        assert_eq!(summary.sample_rate, None);
        assert_eq!(summary.duration_secs, 0.0);
    }

    #[test]
    fn wav_requires_format() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::default();
        let err = snapshot.write_wav(&dir.path().join("x.wav")).unwrap_err();
        assert!(matches!(err, CaptureError::MissingAudioFormat));
    }

    #[test]
    fn wav_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("record.wav");
        let snapshot = sample_snapshot();
        snapshot.write_wav(&path).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 8_000);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, snapshot.audio);
    }

    #[test]
    fn write_assets_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("bundle");
        let written = sample_snapshot().write_assets(&out, false).unwrap();

        assert_eq!(written.len(), 6);
        let accel = fs::read_to_string(out.join("sensor.accel")).unwrap();
        assert!(accel.starts_with("1\t0.0\t0.0\t9.798\n"));
        assert!(out.join("record.wav").exists());
        assert!(!out.join("sensor.gyro").exists());
    }

    #[test]
    fn sensor_only_assets_skip_wav() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = Snapshot {
            audio_format: None,
            ..sample_snapshot()
        };
        let written = snapshot.write_assets(dir.path(), true).unwrap();
        assert_eq!(written.len(), 6);
        assert!(!dir.path().join("record.wav").exists());
    }
}
