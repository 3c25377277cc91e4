//! Append-only time series for one signal of a capture session.

use serde::{Deserialize, Serialize};
use sensor_types::{ChannelKind, TimedSample, Timestamp};

/// An append-only, arrival-ordered series of samples for one signal.
///
/// Samples are expected in non-decreasing timestamp order; the channel
/// trusts its producer and does not re-sort or reject out-of-order input.
///
/// # Example
///
/// ```
/// use sensor_fusion::Channel;
/// use sensor_types::{ChannelKind, Timestamp, Vector3};
///
/// let mut channel = Channel::new(ChannelKind::Accelerometer);
/// channel.push(Timestamp::from_nanos(0), Vector3::ZERO);
/// channel.push(Timestamp::from_nanos(5), Vector3::Z);
///
/// assert_eq!(channel.len(), 2);
/// assert_eq!(channel.latest().map(|s| s.value), Some(Vector3::Z));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Channel<T> {
    kind: ChannelKind,
    samples: Vec<TimedSample<T>>,
}

impl<T> Channel<T> {
    /// Creates an empty channel.
    #[must_use]
    pub const fn new(kind: ChannelKind) -> Self {
        Self {
            kind,
            samples: Vec::new(),
        }
    }

    /// Returns which signal this channel holds.
    #[must_use]
    pub const fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Returns the number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the channel has no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Appends a sample.
    pub fn push(&mut self, timestamp: Timestamp, value: T) {
        self.samples.push(TimedSample::new(timestamp, value));
    }

    /// Returns the oldest sample.
    #[must_use]
    pub fn oldest(&self) -> Option<&TimedSample<T>> {
        self.samples.first()
    }

    /// Returns the most recent sample.
    #[must_use]
    pub fn latest(&self) -> Option<&TimedSample<T>> {
        self.samples.last()
    }

    /// Returns the samples in arrival order.
    #[must_use]
    pub fn samples(&self) -> &[TimedSample<T>] {
        &self.samples
    }

    /// Returns an iterator over the samples.
    pub fn iter(&self) -> impl Iterator<Item = &TimedSample<T>> {
        self.samples.iter()
    }

    /// Returns the time covered by the channel in nanoseconds.
    ///
    /// Returns `None` if the channel has fewer than 2 samples.
    #[must_use]
    pub fn time_span(&self) -> Option<i64> {
        if self.samples.len() < 2 {
            return None;
        }
        let oldest = self.oldest()?;
        let newest = self.latest()?;
        Some(newest.timestamp.nanos_since(oldest.timestamp))
    }

    /// Removes all samples, keeping the allocation.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Moves all samples out, leaving the channel empty.
    pub fn take(&mut self) -> Vec<TimedSample<T>> {
        std::mem::take(&mut self.samples)
    }

    /// Computes statistics about the channel.
    #[must_use]
    pub fn stats(&self) -> ChannelStats {
        ChannelStats {
            kind: self.kind,
            count: self.len(),
            first_timestamp: self.oldest().map(|s| s.timestamp),
            last_timestamp: self.latest().map(|s| s.timestamp),
            time_span_nanos: self.time_span(),
        }
    }
}

impl<T: Copy> Channel<T> {
    /// Returns a copy of the samples.
    #[must_use]
    pub fn to_vec(&self) -> Vec<TimedSample<T>> {
        self.samples.clone()
    }
}

/// Statistics about a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelStats {
    /// Signal held by the channel.
    pub kind: ChannelKind,

    /// Number of samples.
    pub count: usize,

    /// Timestamp of the first sample.
    pub first_timestamp: Option<Timestamp>,

    /// Timestamp of the last sample.
    pub last_timestamp: Option<Timestamp>,

    /// Covered time in nanoseconds.
    pub time_span_nanos: Option<i64>,
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
    use sensor_types::Vector3;

    fn ts(nanos: i64) -> Timestamp {
        Timestamp::from_nanos(nanos)
    }

    #[test]
    fn channel_new() {
        let channel: Channel<Vector3> = Channel::new(ChannelKind::Gravity);
        assert_eq!(channel.kind(), ChannelKind::Gravity);
        assert!(channel.is_empty());
        assert!(channel.latest().is_none());
    }

    #[test]
    fn channel_push_keeps_arrival_order() {
        let mut channel = Channel::new(ChannelKind::Accelerometer);
        for i in 0..5 {
            channel.push(ts(i * 10), Vector3::splat(i as f32));
        }

        assert_eq!(channel.len(), 5);
        let values: Vec<f32> = channel.iter().map(|s| s.value.x).collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn channel_is_unbounded() {
        let mut channel = Channel::new(ChannelKind::Gyroscope);
        for i in 0..10_000 {
            channel.push(ts(i), Vector3::ZERO);
        }
        assert_eq!(channel.len(), 10_000);
        assert_eq!(channel.oldest().unwrap().timestamp, ts(0));
    }

    #[test]
    fn channel_oldest_latest() {
        let mut channel = Channel::new(ChannelKind::Accelerometer);
        channel.push(ts(1), Vector3::X);
        channel.push(ts(2), Vector3::Y);

        assert_eq!(channel.oldest().unwrap().value, Vector3::X);
        assert_eq!(channel.latest().unwrap().value, Vector3::Y);
    }

    #[test]
    fn channel_time_span() {
        let mut channel = Channel::new(ChannelKind::Accelerometer);
        assert!(channel.time_span().is_none());

        channel.push(ts(100), Vector3::ZERO);
        assert!(channel.time_span().is_none());

        channel.push(ts(350), Vector3::ZERO);
        assert_eq!(channel.time_span(), Some(250));
    }

    #[test]
    fn channel_take_empties() {
        let mut channel = Channel::new(ChannelKind::Accelerometer);
        channel.push(ts(1), Vector3::X);
        channel.push(ts(2), Vector3::Y);

        let taken = channel.take();
        assert_eq!(taken.len(), 2);
        assert!(channel.is_empty());
        assert_eq!(channel.kind(), ChannelKind::Accelerometer);
    }

    #[test]
    fn channel_to_vec_is_a_copy() {
        let mut channel = Channel::new(ChannelKind::Accelerometer);
        channel.push(ts(1), Vector3::X);
        let copy = channel.to_vec();
        channel.clear();

        assert_eq!(copy.len(), 1);
        assert!(channel.is_empty());
    }

    #[test]
    fn channel_stats() {
        let mut channel = Channel::new(ChannelKind::RotationVector);
        channel.push(ts(0), 1.0_f32);
        channel.push(ts(1_000), 2.0);
        channel.push(ts(2_000), 3.0);

        let stats = channel.stats();
        assert_eq!(stats.kind, ChannelKind::RotationVector);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.first_timestamp, Some(ts(0)));
        assert_eq!(stats.last_timestamp, Some(ts(2_000)));
        assert_eq!(stats.time_span_nanos, Some(2_000));
    }

    #[test]
    fn channel_stats_empty() {
        let channel: Channel<f32> = Channel::new(ChannelKind::Gravity);
        let stats = channel.stats();

        assert_eq!(stats.count, 0);
        assert!(stats.first_timestamp.is_none());
        assert!(stats.time_span_nanos.is_none());
    }

    #[test]
    fn channel_stats_serialize() {
        let channel: Channel<f32> = Channel::new(ChannelKind::Gravity);
        let json = serde_json::to_string(&channel.stats()).unwrap();
        assert!(json.contains("\"gravity\""));
    }
}
