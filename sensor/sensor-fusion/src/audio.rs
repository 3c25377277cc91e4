//! Capacity-bounded raw audio buffer.
//!
//! Audio arrives in fixed-size chunks of 16-bit PCM. The buffer stores whole
//! chunks up to a chunk-count ceiling, which caps the recording length.
//! Chunks past the ceiling are dropped; the first drop of a session is
//! reported as [`AudioAppend::LimitReached`] so the caller can notify once.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{FusionError, Result};

/// Samples per chunk delivered by the capture device.
pub const DEFAULT_CHUNK_SAMPLES: usize = 1024;

/// Chunk ceiling per session.
pub const DEFAULT_MAX_CHUNKS: usize = 1000;

/// Outcome of appending a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioAppend {
    /// The chunk was stored.
    Stored,
    /// The ceiling was hit for the first time; the chunk was dropped.
    LimitReached,
    /// The ceiling had already been hit; the chunk was dropped.
    Dropped,
}

/// A growable, chunk-bounded buffer of 16-bit PCM samples.
///
/// # Example
///
/// ```
/// use sensor_fusion::{AudioAppend, AudioBuffer};
///
/// let mut audio = AudioBuffer::new(4, 2).unwrap();
/// assert_eq!(audio.append_chunk(&[1, 2, 3, 4]).unwrap(), AudioAppend::Stored);
/// assert_eq!(audio.append_chunk(&[5, 6, 7, 8]).unwrap(), AudioAppend::Stored);
/// assert_eq!(audio.append_chunk(&[9, 9, 9, 9]).unwrap(), AudioAppend::LimitReached);
/// assert_eq!(audio.chunk_count(), 2);
/// assert_eq!(&audio.to_le_bytes()[..4], &[1_u8, 0, 2, 0]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioBuffer {
    chunk_samples: usize,
    max_chunks: usize,
    samples: Vec<i16>,
    limit_reached: bool,
}

impl Default for AudioBuffer {
    fn default() -> Self {
        Self {
            chunk_samples: DEFAULT_CHUNK_SAMPLES,
            max_chunks: DEFAULT_MAX_CHUNKS,
            samples: Vec::new(),
            limit_reached: false,
        }
    }
}

impl AudioBuffer {
    /// Creates a buffer holding at most `max_chunks` chunks of `chunk_samples`.
    ///
    /// # Errors
    ///
    /// Returns an error if either dimension is zero.
    pub fn new(chunk_samples: usize, max_chunks: usize) -> Result<Self> {
        if chunk_samples == 0 {
            return Err(FusionError::invalid_config("chunk size must be positive"));
        }
        if max_chunks == 0 {
            return Err(FusionError::invalid_config("max chunks must be positive"));
        }
        Ok(Self {
            chunk_samples,
            max_chunks,
            samples: Vec::new(),
            limit_reached: false,
        })
    }

    /// Samples per chunk.
    #[must_use]
    pub const fn chunk_samples(&self) -> usize {
        self.chunk_samples
    }

    /// Chunk ceiling.
    #[must_use]
    pub const fn max_chunks(&self) -> usize {
        self.max_chunks
    }

    /// Number of stored chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.samples.len() / self.chunk_samples
    }

    /// Number of stored samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns true once the chunk ceiling is reached.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.chunk_count() >= self.max_chunks
    }

    /// Returns true if the ceiling has been reported this session.
    #[must_use]
    pub const fn limit_reached(&self) -> bool {
        self.limit_reached
    }

    /// Stored samples.
    #[must_use]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Appends one chunk.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::ChunkSizeMismatch`] if `chunk` is not exactly
    /// one chunk long. A full buffer is not an error.
    pub fn append_chunk(&mut self, chunk: &[i16]) -> Result<AudioAppend> {
        if chunk.len() != self.chunk_samples {
            return Err(FusionError::chunk_size_mismatch(
                self.chunk_samples,
                chunk.len(),
            ));
        }

        if self.is_full() {
            return Ok(if self.mark_limit_reached() {
                AudioAppend::LimitReached
            } else {
                AudioAppend::Dropped
            });
        }

        if self.samples.capacity() == 0 {
            // Reserve a few seconds up front, grow from there.
            self.samples
                .reserve(self.chunk_samples * self.max_chunks.min(64));
        }
        self.samples.extend_from_slice(chunk);
        Ok(AudioAppend::Stored)
    }

    /// Records that the ceiling was hit without a chunk being offered.
    ///
    /// Returns true only the first time per session.
    pub fn mark_limit_reached(&mut self) -> bool {
        if self.limit_reached {
            return false;
        }
        self.limit_reached = true;
        warn!(
            chunks = self.chunk_count(),
            max_chunks = self.max_chunks,
            "audio duration limit reached, dropping further chunks"
        );
        true
    }

    /// Packs the samples as little-endian byte pairs.
    #[must_use]
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    /// Recording length in seconds at `sample_rate`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_secs(&self, sample_rate: u32) -> f64 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(sample_rate)
    }

    /// Moves the samples out and resets the session state.
    pub fn take(&mut self) -> Vec<i16> {
        self.limit_reached = false;
        std::mem::take(&mut self.samples)
    }

    /// Clears samples and the limit flag.
    pub fn clear(&mut self) {
        self.samples.clear();
        self.limit_reached = false;
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

    #[test]
    fn audio_new_rejects_zero() {
        assert!(AudioBuffer::new(0, 10).is_err());
        assert!(AudioBuffer::new(10, 0).is_err());
    }

    #[test]
    fn audio_default_dimensions() {
        let audio = AudioBuffer::default();
        assert_eq!(audio.chunk_samples(), 1024);
        assert_eq!(audio.max_chunks(), 1000);
        assert!(audio.is_empty());
    }

    #[test]
    fn audio_ceiling_drops_and_reports_once() {
        let mut audio = AudioBuffer::default();
        let chunk = vec![7_i16; DEFAULT_CHUNK_SAMPLES];

        let mut stored = 0;
        let mut reported = 0;
        for _ in 0..1001 {
            match audio.append_chunk(&chunk).unwrap() {
                AudioAppend::Stored => stored += 1,
                AudioAppend::LimitReached => reported += 1,
                AudioAppend::Dropped => {}
            }
        }

        assert_eq!(stored, 1000);
        assert_eq!(reported, 1);
        assert_eq!(audio.chunk_count(), 1000);
        assert_eq!(audio.len(), 1000 * 1024);

        // Further chunks are dropped silently.
        assert_eq!(audio.append_chunk(&chunk).unwrap(), AudioAppend::Dropped);
    }

    #[test]
    fn audio_exactly_full_is_not_reported() {
        let mut audio = AudioBuffer::new(2, 3).unwrap();
        for _ in 0..3 {
            assert_eq!(audio.append_chunk(&[0, 0]).unwrap(), AudioAppend::Stored);
        }
        assert!(audio.is_full());
        assert!(!audio.limit_reached());
    }

    #[test]
    fn audio_rejects_wrong_chunk_size() {
        let mut audio = AudioBuffer::new(4, 2).unwrap();
        let err = audio.append_chunk(&[1, 2, 3]).unwrap_err();
        assert!(err.to_string().contains("expected 4"));
        assert!(audio.is_empty());
    }

    #[test]
    fn audio_mark_limit_once() {
        let mut audio = AudioBuffer::new(2, 1).unwrap();
        assert!(audio.mark_limit_reached());
        assert!(!audio.mark_limit_reached());
        assert_eq!(audio.append_chunk(&[1, 1]).unwrap(), AudioAppend::Stored);
        assert_eq!(audio.append_chunk(&[1, 1]).unwrap(), AudioAppend::Dropped);
    }

    #[test]
    fn audio_le_bytes() {
        let mut audio = AudioBuffer::new(2, 4).unwrap();
        audio.append_chunk(&[0x0102, -2]).unwrap();
        assert_eq!(audio.to_le_bytes(), vec![0x02, 0x01, 0xFE, 0xFF]);
    }

    #[test]
    fn audio_take_resets_session() {
        let mut audio = AudioBuffer::new(1, 1).unwrap();
        audio.append_chunk(&[5]).unwrap();
        audio.append_chunk(&[6]).unwrap();
        assert!(audio.limit_reached());

        let taken = audio.take();
        assert_eq!(taken, vec![5]);
        assert!(audio.is_empty());
        assert!(!audio.limit_reached());
        assert_eq!(audio.append_chunk(&[8]).unwrap(), AudioAppend::Stored);
    }

    #[test]
    fn audio_duration() {
        let mut audio = AudioBuffer::new(4, 10).unwrap();
        audio.append_chunk(&[0; 4]).unwrap();
        audio.append_chunk(&[0; 4]).unwrap();
        assert!((audio.duration_secs(8) - 1.0).abs() < 1e-12);
        assert_eq!(audio.duration_secs(0), 0.0);
    }
}
