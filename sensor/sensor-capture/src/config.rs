//! Capture configuration: TOML file plus environment overlay.

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sensor_fusion::{DEFAULT_CHUNK_SAMPLES, DEFAULT_MAX_CHUNKS, STANDARD_GRAVITY};
use sensor_types::Vector3;

use crate::error::ConfigError;

/// Environment variable overriding `audio.max_chunks`.
pub const ENV_MAX_CHUNKS: &str = "SENSOR_CAPTURE_MAX_CHUNKS";
/// Environment variable overriding `sensors.gyroscope`.
pub const ENV_GYROSCOPE: &str = "SENSOR_CAPTURE_GYROSCOPE";
/// Environment variable overriding `sensors.gravity`.
pub const ENV_GRAVITY: &str = "SENSOR_CAPTURE_GRAVITY";

/// Sample rates probed when opening the microphone, in order.
pub const DEFAULT_SAMPLE_RATES: [u32; 6] = [48_000, 44_100, 22_050, 11_025, 8_000, 16_000];

/// Top-level capture configuration.
///
/// # Example
///
/// ```
/// use sensor_capture::CaptureConfig;
///
/// let config = CaptureConfig::from_toml_str(
///     r#"
///     [audio]
///     max_chunks = 500
///
///     [sensors]
///     gyroscope = true
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(config.audio.max_chunks, 500);
/// assert_eq!(config.audio.chunk_samples, 1024);
/// assert!(config.sensors.gyroscope);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Microphone settings.
    pub audio: AudioConfig,

    /// Inertial sensor settings.
    pub sensors: SensorConfig,

    /// Depth of the bounded event queue between producers and the controller.
    pub queue_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            sensors: SensorConfig::default(),
            queue_capacity: 4096,
        }
    }
}

/// Microphone capture settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Samples per chunk read from the device.
    pub chunk_samples: usize,

    /// Chunk ceiling per session (caps the recording length).
    pub max_chunks: usize,

    /// Sample rates to probe, in preference order.
    pub sample_rates: Vec<u32>,

    /// Channel count (1 = mono).
    pub channels: u16,

    /// Fail `start` instead of recording sensors only when no device opens.
    pub require_device: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            chunk_samples: DEFAULT_CHUNK_SAMPLES,
            max_chunks: DEFAULT_MAX_CHUNKS,
            sample_rates: DEFAULT_SAMPLE_RATES.to_vec(),
            channels: 1,
            require_device: false,
        }
    }
}

/// Inertial sensor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Gravity magnitude removed from the world Z axis, m/s².
    pub gravity: f32,

    /// Record gyroscope events and include them in the outbound bundle.
    pub gyroscope: bool,

    /// Linear correction applied to raw accelerometer values.
    pub accel_calibration: AccelCalibration,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            gravity: STANDARD_GRAVITY,
            gyroscope: false,
            accel_calibration: AccelCalibration::default(),
        }
    }
}

/// Per-axis accelerometer correction `(v + offset) * scale`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccelCalibration {
    /// Added to each raw axis first.
    pub offset: [f32; 3],

    /// Multiplied after the offset.
    pub scale: [f32; 3],
}

impl Default for AccelCalibration {
    fn default() -> Self {
        Self {
            offset: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

impl AccelCalibration {
    /// Applies the correction to a raw reading.
    #[must_use]
    pub fn apply(&self, raw: Vector3) -> Vector3 {
        (raw + Vector3::from_array(self.offset)) * Vector3::from_array(self.scale)
    }

    /// Returns true if this correction leaves readings unchanged.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn is_identity(&self) -> bool {
        self.offset == [0.0; 3] && self.scale == [1.0; 3]
    }
}

impl CaptureConfig {
    /// Parses a config from TOML text, then validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this schema or a
    /// value is out of range.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Self::parse(contents, Path::new("<inline>"))
    }

    /// Loads a config file, applies environment overrides, and validates.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or a value is
    /// out of range.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config = Self::parse(&contents, path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Overlays values from `SENSOR_CAPTURE_*` environment variables.
    ///
    /// Returns the names of the variables that were applied.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn apply_env_overrides(&mut self) -> Result<Vec<&'static str>, ConfigError> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Vec<&'static str>, ConfigError> {
        let mut applied = Vec::new();

        if let Some(v) = lookup(ENV_MAX_CHUNKS) {
            self.audio.max_chunks = v
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid_value(ENV_MAX_CHUNKS, format!("'{v}' is not a count")))?;
            applied.push(ENV_MAX_CHUNKS);
        }
        if let Some(v) = lookup(ENV_GYROSCOPE) {
            self.sensors.gyroscope = match v.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(ConfigError::invalid_value(
                        ENV_GYROSCOPE,
                        format!("'{v}' is not a boolean"),
                    ));
                }
            };
            applied.push(ENV_GYROSCOPE);
        }
        if let Some(v) = lookup(ENV_GRAVITY) {
            self.sensors.gravity = v
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid_value(ENV_GRAVITY, format!("'{v}' is not a number")))?;
            applied.push(ENV_GRAVITY);
        }

        Ok(applied)
    }

    /// Checks that all values are in range.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audio.chunk_samples == 0 {
            return Err(ConfigError::invalid_value("audio.chunk_samples", "must be positive"));
        }
        if self.audio.max_chunks == 0 {
            return Err(ConfigError::invalid_value("audio.max_chunks", "must be positive"));
        }
        if self.audio.sample_rates.is_empty() {
            return Err(ConfigError::invalid_value("audio.sample_rates", "must not be empty"));
        }
        if self.audio.sample_rates.contains(&0) {
            return Err(ConfigError::invalid_value("audio.sample_rates", "rates must be positive"));
        }
        if self.audio.channels == 0 {
            return Err(ConfigError::invalid_value("audio.channels", "must be positive"));
        }
        if !self.sensors.gravity.is_finite() || self.sensors.gravity <= 0.0 {
            return Err(ConfigError::invalid_value("sensors.gravity", "must be finite and positive"));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::invalid_value("queue_capacity", "must be positive"));
        }
        Ok(())
    }

    /// Set the chunk ceiling.
    #[must_use]
    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.audio.max_chunks = max_chunks;
        self
    }

    /// Set the chunk size.
    #[must_use]
    pub fn with_chunk_samples(mut self, chunk_samples: usize) -> Self {
        self.audio.chunk_samples = chunk_samples;
        self
    }

    /// Enable or disable the gyroscope channel.
    #[must_use]
    pub fn with_gyroscope(mut self, enabled: bool) -> Self {
        self.sensors.gyroscope = enabled;
        self
    }

    /// Require a working microphone to start.
    #[must_use]
    pub fn with_require_device(mut self, required: bool) -> Self {
        self.audio.require_device = required;
        self
    }

    /// Set the accelerometer correction.
    #[must_use]
    pub fn with_accel_calibration(mut self, calibration: AccelCalibration) -> Self {
        self.sensors.accel_calibration = calibration;
        self
    }

    /// Set the event queue depth.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_device() {
        let config = CaptureConfig::default();
        assert_eq!(config.audio.chunk_samples, 1024);
        assert_eq!(config.audio.max_chunks, 1000);
        assert_eq!(config.audio.sample_rates, vec![48_000, 44_100, 22_050, 11_025, 8_000, 16_000]);
        assert_eq!(config.audio.channels, 1);
        assert!(!config.audio.require_device);
        assert_eq!(config.sensors.gravity, 9.798);
        assert!(!config.sensors.gyroscope);
        assert!(config.sensors.accel_calibration.is_identity());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_toml_is_default() {
        let config = CaptureConfig::from_toml_str("").unwrap();
        assert_eq!(config, CaptureConfig::default());
    }

    #[test]
    fn toml_calibration() {
        let config = CaptureConfig::from_toml_str(
            r"
            [sensors.accel_calibration]
            offset = [0.5, 0.0, -0.5]
            scale = [2.0, 1.0, 1.0]
            ",
        )
        .unwrap();
        let cal = config.sensors.accel_calibration;
        assert!(!cal.is_identity());
        assert_eq!(cal.apply(Vector3::new(1.0, 1.0, 1.0)), Vector3::new(3.0, 1.0, 0.5));
    }

    #[test]
    fn toml_rejects_unknown_type() {
        let err = CaptureConfig::from_toml_str("queue_capacity = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn validate_rejects_zero_chunks() {
        let err = CaptureConfig::default().with_max_chunks(0).validate().unwrap_err();
        assert!(err.to_string().contains("audio.max_chunks"));
    }

    #[test]
    fn validate_rejects_bad_gravity() {
        let mut config = CaptureConfig::default();
        config.sensors.gravity = f32::NAN;
        assert!(config.validate().is_err());
        config.sensors.gravity = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_rates() {
        let mut config = CaptureConfig::default();
        config.audio.sample_rates.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn overrides_apply() {
        let vars: HashMap<&str, &str> = [
            (ENV_MAX_CHUNKS, "250"),
            (ENV_GYROSCOPE, "yes"),
            (ENV_GRAVITY, "9.81"),
        ]
        .into_iter()
        .collect();

        let mut config = CaptureConfig::default();
        let applied = config
            .apply_overrides(|k| vars.get(k).map(ToString::to_string))
            .unwrap();

        assert_eq!(applied.len(), 3);
        assert_eq!(config.audio.max_chunks, 250);
        assert!(config.sensors.gyroscope);
        assert_eq!(config.sensors.gravity, 9.81);
    }

    #[test]
    fn overrides_reject_garbage() {
        let mut config = CaptureConfig::default();
        let err = config
            .apply_overrides(|k| (k == ENV_GYROSCOPE).then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_GYROSCOPE));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "queue_capacity = 16\n[audio]\nchunk_samples = 256").unwrap();

        let config = CaptureConfig::load(file.path()).unwrap();
        assert_eq!(config.queue_capacity, 16);
        assert_eq!(config.audio.chunk_samples, 256);
    }

    #[test]
    fn load_missing_file() {
        let err = CaptureConfig::load(Path::new("/nonexistent/capture.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }

    #[test]
    fn builders() {
        let config = CaptureConfig::default()
            .with_chunk_samples(8)
            .with_max_chunks(4)
            .with_gyroscope(true)
            .with_require_device(true)
            .with_queue_capacity(2);
        assert_eq!(config.audio.chunk_samples, 8);
        assert_eq!(config.audio.max_chunks, 4);
        assert!(config.sensors.gyroscope);
        assert!(config.audio.require_device);
        assert_eq!(config.queue_capacity, 2);
    }
}
