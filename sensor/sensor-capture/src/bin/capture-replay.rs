//! capture-replay - drive one capture session from recorded data
//!
//! Reads a tab-separated sensor log and an optional raw PCM16 file, runs
//! them through a full start/stop cycle and writes the outbound asset
//! bundle (plus `record.wav`) to a directory.
//!
//! Log lines are `kind<TAB>timestamp_ns<TAB>v0<TAB>v1<TAB>v2[<TAB>v3]` with
//! kind one of `accel`, `gyro`, `rotvec`. Blank lines and `#` comments are
//! skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use crossbeam_channel::unbounded;
use sensor_capture::{
    AudioDevice, AudioDeviceProvider, AudioFormat, CaptureConfig, CaptureController, CaptureEvent,
    CaptureNotice, DirectorySink, PcmReaderDevice,
};
use sensor_types::{SensorEvent, SensorKind, Timestamp};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "capture-replay")]
#[command(about = "Replay a recorded sensor log through a capture session")]
#[command(version)]
struct Cli {
    /// Tab-separated sensor event log
    events: PathBuf,

    /// Output directory for the asset bundle
    #[arg(short, long, default_value = "capture-out")]
    out: PathBuf,

    /// Raw little-endian 16-bit mono PCM to replay as the microphone
    #[arg(short, long)]
    audio: Option<PathBuf>,

    /// Sample rate of the PCM file
    #[arg(long, default_value = "16000")]
    sample_rate: u32,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Record gyroscope events and include them in the bundle
    #[arg(long)]
    gyro: bool,
}

/// Hands out one PCM file, only at the rate it was recorded with.
struct ReplayMic {
    sample_rate: u32,
    file: Mutex<Option<BufReader<File>>>,
}

impl AudioDeviceProvider for ReplayMic {
    fn open(&self, format: AudioFormat) -> Option<Box<dyn AudioDevice>> {
        if format.sample_rate != self.sample_rate {
            return None;
        }
        let reader = self.file.lock().ok()?.take()?;
        Some(Box::new(PcmReaderDevice::new(reader, format)))
    }
}

fn parse_line(line: &str) -> Result<Option<SensorEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut fields = line.split('\t');
    let kind: SensorKind = fields.next().unwrap_or_default().parse()?;
    let nanos: i64 = fields
        .next()
        .context("missing timestamp")?
        .trim()
        .parse()
        .context("bad timestamp")?;
    let values = fields
        .map(|f| f.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .context("bad sample value")?;

    Ok(Some(SensorEvent::from_values(
        kind,
        Timestamp::from_nanos(nanos),
        &values,
    )?))
}

fn read_events(path: &Path) -> Result<Vec<SensorEvent>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut events = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if let Some(event) =
            parse_line(&line).with_context(|| format!("{}:{}", path.display(), n + 1))?
        {
            events.push(event);
        }
    }
    Ok(events)
}

fn load_config(cli: &Cli) -> Result<CaptureConfig> {
    let mut config = match &cli.config {
        Some(path) => CaptureConfig::load(path)?,
        None => {
            let mut config = CaptureConfig::default();
            config.apply_env_overrides()?;
            config
        }
    };
    if cli.gyro {
        config.sensors.gyroscope = true;
    }
    config.audio.sample_rates = vec![cli.sample_rate];
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let events = read_events(&cli.events)?;
    info!(events = events.len(), "loaded sensor log");

    let audio = match &cli.audio {
        Some(path) => Some(BufReader::new(
            File::open(path).with_context(|| format!("opening {}", path.display()))?,
        )),
        None => None,
    };
    let provider = Arc::new(ReplayMic {
        sample_rate: cli.sample_rate,
        file: Mutex::new(audio),
    });

    let include_gyro = config.sensors.gyroscope;
    let (notice_tx, notice_rx) = unbounded();
    let mut controller = CaptureController::with_notices(
        config,
        provider,
        Box::new(DirectorySink::new(&cli.out, include_gyro)),
        notice_tx,
    )?;

    controller.start()?;
    for event in events {
        if let Err(e) = controller.handle_event(CaptureEvent::Sensor(event)) {
            warn!(error = %e, "event rejected");
        }
        controller.process_pending();
    }
    while controller.audio_active() {
        controller.process_pending();
        thread::sleep(Duration::from_millis(1));
    }
    let summary = controller.stop_and_dispatch()?;
    // Dropping the controller waits for the sink to finish writing.
    drop(controller);

    for notice in notice_rx.try_iter() {
        match notice {
            CaptureNotice::DeliveryFailed { reason } => bail!("writing bundle failed: {reason}"),
            CaptureNotice::DurationExceeded { max_chunks } => {
                warn!(max_chunks, "audio truncated at the duration limit");
            }
            _ => {}
        }
    }

    info!(
        accel = summary.accelerometer,
        rotvec = summary.rotation_vector,
        laccel = summary.linear_acceleration,
        audio_secs = summary.duration_secs,
        out = %cli.out.display(),
        "replay complete"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use sensor_types::SensorReading;

    #[test]
    fn parses_rotation_line() {
        let event = parse_line("rotvec\t42\t0\t0\t0\t1").unwrap().unwrap();
        assert_eq!(event.timestamp, Timestamp::from_nanos(42));
        assert!(matches!(event.reading, SensorReading::RotationVector(q) if q.w == 1.0));
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        assert!(parse_line("").unwrap().is_none());
        assert!(parse_line("# kind\tts\tx\ty\tz").unwrap().is_none());
    }

    #[test]
    fn rejects_bad_lines() {
        assert!(parse_line("magnet\t1\t0\t0\t0").is_err());
        assert!(parse_line("accel\tnow\t0\t0\t0").is_err());
        assert!(parse_line("accel\t1\t0\t0").is_err());
    }
}
