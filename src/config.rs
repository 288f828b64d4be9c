//! Engine configuration - read once at startup, immutable afterwards.
//!
//! Every field has a default so a partial JSON document (or none at all) is
//! enough to run. The defaults reproduce the five-instrument orchestra.

use std::path::Path;

use ariadne::{IndexType, Label, Report, ReportKind, Source};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{OrchestraError, Result};

/// Instruments that can be placed in the orchestra.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Melody,
    Noise,
    Drone,
    Rhythm,
    Accent,
}

impl SectionKind {
    pub const ALL: [SectionKind; 5] = [
        SectionKind::Melody,
        SectionKind::Noise,
        SectionKind::Drone,
        SectionKind::Rhythm,
        SectionKind::Accent,
    ];
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestraConfig {
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Gain applied to the summed instruments, in (0, 1].
    pub master_gain: f64,
    /// Frames rendered per internal chunk. Driver buffers of any size are
    /// split into chunks of at most this many frames.
    pub block_size: usize,
    /// Enabled instruments, in mixing order.
    pub sections: Vec<SectionKind>,
    pub melody: MelodyConfig,
    pub noise: NoiseConfig,
    pub drone: DroneConfig,
    pub rhythm: RhythmConfig,
    pub accent: AccentConfig,
    pub control: ControlConfig,
}

impl Default for OrchestraConfig {
    fn default() -> Self {
        OrchestraConfig {
            sample_rate: 44_100,
            master_gain: 0.3,
            block_size: 1024,
            sections: SectionKind::ALL.to_vec(),
            melody: MelodyConfig::default(),
            noise: NoiseConfig::default(),
            drone: DroneConfig::default(),
            rhythm: RhythmConfig::default(),
            accent: AccentConfig::default(),
            control: ControlConfig::default(),
        }
    }
}

/// Step sequencer driven by coronal mass ejection speeds (km/s).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MelodyConfig {
    pub speed_min: f64,
    pub speed_max: f64,
    /// Number of steps in the sequence (L).
    pub sequence_length: usize,
    /// Note duration in seconds.
    pub note_duration: f64,
    /// Linear attack in seconds.
    pub attack: f64,
    pub gain: f64,
    /// Ascending pitch set in Hz.
    pub scale: Vec<f64>,
}

impl Default for MelodyConfig {
    fn default() -> Self {
        MelodyConfig {
            speed_min: 300.0,
            speed_max: 2000.0,
            sequence_length: 16,
            note_duration: 0.5,
            attack: 0.01,
            gain: 0.7,
            scale: vec![
                65.41, 73.42, 77.78, 87.31, 98.00, 103.83, 116.54, 130.81, 146.83, 155.56,
                174.61, 196.00, 207.65, 233.08, 261.63, 293.66, 311.13, 349.23, 392.00,
                415.30, 466.16,
            ],
        }
    }
}

/// White noise scaled by the planetary Kp index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    pub kp_max: u32,
    pub max_intensity: f64,
    /// Seed for the noise generator, so renders are reproducible.
    pub seed: u64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        NoiseConfig {
            kp_max: 9,
            max_intensity: 0.15,
            seed: 0x5eed_b0a7,
        }
    }
}

/// Sine drone tuned by the daily sunspot number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DroneConfig {
    pub sunspot_max: u32,
    pub freq_min: f64,
    pub freq_max: f64,
    pub gain: f64,
}

impl Default for DroneConfig {
    fn default() -> Self {
        DroneConfig {
            sunspot_max: 250,
            freq_min: 30.0,
            freq_max: 80.0,
            gain: 0.6,
        }
    }
}

/// Fixed-period click train (Vela pulsar).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RhythmConfig {
    /// Seconds between clicks.
    pub period: f64,
    pub click_freq: f64,
    /// Decay time constant of a click in seconds.
    pub click_decay: f64,
    /// Click length, in decay time constants.
    pub click_decay_count: f64,
    pub gain: f64,
}

impl Default for RhythmConfig {
    fn default() -> Self {
        RhythmConfig {
            period: 0.08933,
            click_freq: 1200.0,
            click_decay: 0.05,
            click_decay_count: 5.0,
            gain: 0.5,
        }
    }
}

/// One harmonic component of the accent gong.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartialConfig {
    pub ratio: f64,
    pub amplitude: f64,
}

/// One-shot gong triggered by a new solar flare.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccentConfig {
    /// Total gong length in seconds.
    pub duration: f64,
    pub base_freq: f64,
    pub partials: Vec<PartialConfig>,
    /// Intensity for X-class flares.
    pub high_intensity: f64,
    /// Intensity for M-class flares.
    pub mid_intensity: f64,
    /// Intensity for everything else.
    pub low_intensity: f64,
}

impl Default for AccentConfig {
    fn default() -> Self {
        AccentConfig {
            duration: 8.0,
            base_freq: 120.0,
            partials: vec![
                PartialConfig { ratio: 1.0, amplitude: 1.0 },
                PartialConfig { ratio: 1.51, amplitude: 0.5 },
                PartialConfig { ratio: 2.75, amplitude: 0.3 },
            ],
            high_intensity: 1.0,
            mid_intensity: 0.7,
            low_intensity: 0.4,
        }
    }
}

/// Control-rate updater settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Seconds between data source polls.
    pub update_interval_secs: u64,
    /// Snapshots that may be queued for the audio thread.
    pub queue_capacity: usize,
}

impl Default for ControlConfig {
    fn default() -> Self {
        ControlConfig {
            update_interval_secs: 300,
            queue_capacity: 4,
        }
    }
}

/// Configuration problems found while loading or validating.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("parse error: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("`{field}` {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }

    /// Render a human readable diagnostic. Parse errors point at the
    /// offending position in `source`.
    pub fn report(&self, path: &str, source: &str) -> String {
        let ConfigError::Parse(err) = self else {
            return format!("{path}: {self}");
        };

        let offset = byte_offset(source, err.line(), err.column());
        let span = offset..(offset + 1).min(source.len());
        let mut out = Vec::new();
        let written = Report::build(ReportKind::Error, (path, span.clone()))
            .with_config(
                ariadne::Config::default()
                    .with_color(false)
                    .with_index_type(IndexType::Byte),
            )
            .with_message("configuration is not valid JSON")
            .with_label(Label::new((path, span)).with_message(err.to_string()))
            .finish()
            .write((path, Source::from(source)), &mut out);

        match written {
            Ok(()) => String::from_utf8_lossy(&out).into_owned(),
            Err(_) => format!("{path}: {self}"),
        }
    }
}

/// Convert serde_json's 1-based line/column into a byte offset.
fn byte_offset(source: &str, line: usize, column: usize) -> usize {
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(source.len())
}

impl OrchestraConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(source: &str) -> std::result::Result<Self, ConfigError> {
        let config: OrchestraConfig = serde_json::from_str(source).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| OrchestraError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&source)?;
        info!(
            path = %path.display(),
            sample_rate = config.sample_rate,
            sections = config.sections.len(),
            "loaded configuration"
        );
        Ok(config)
    }

    /// Same configuration at a different sample rate, used when the output
    /// device cannot run at the requested one.
    pub fn with_sample_rate(&self, sample_rate: u32) -> Self {
        debug!(from = self.sample_rate, to = sample_rate, "overriding sample rate");
        OrchestraConfig {
            sample_rate,
            ..self.clone()
        }
    }

    /// Check every bound the instruments rely on.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::invalid("sample_rate", "must be positive"));
        }
        if !(self.master_gain > 0.0 && self.master_gain <= 1.0) {
            return Err(ConfigError::invalid("master_gain", "must be in (0, 1]"));
        }
        if self.block_size == 0 {
            return Err(ConfigError::invalid("block_size", "must be at least 1"));
        }

        let m = &self.melody;
        if !(m.speed_max > m.speed_min) {
            return Err(ConfigError::invalid("melody.speed_max", "must exceed speed_min"));
        }
        if m.sequence_length == 0 {
            return Err(ConfigError::invalid("melody.sequence_length", "must be at least 1"));
        }
        if m.scale.is_empty() {
            return Err(ConfigError::invalid("melody.scale", "must not be empty"));
        }
        if m.scale.windows(2).any(|w| w[0] > w[1]) {
            return Err(ConfigError::invalid("melody.scale", "must be ascending"));
        }
        if !(m.attack >= 0.0 && m.note_duration > m.attack) {
            return Err(ConfigError::invalid(
                "melody.note_duration",
                "must exceed a non-negative attack",
            ));
        }

        if self.noise.kp_max == 0 {
            return Err(ConfigError::invalid("noise.kp_max", "must be positive"));
        }
        if self.noise.max_intensity < 0.0 {
            return Err(ConfigError::invalid("noise.max_intensity", "must not be negative"));
        }

        let d = &self.drone;
        if d.sunspot_max == 0 {
            return Err(ConfigError::invalid("drone.sunspot_max", "must be positive"));
        }
        if !(d.freq_min > 0.0 && d.freq_max > d.freq_min) {
            return Err(ConfigError::invalid(
                "drone.freq_max",
                "must exceed a positive freq_min",
            ));
        }

        let r = &self.rhythm;
        if !(r.period > 0.0) {
            return Err(ConfigError::invalid("rhythm.period", "must be positive"));
        }
        if !(r.click_decay > 0.0 && r.click_decay_count > 0.0) {
            return Err(ConfigError::invalid("rhythm.click_decay", "must be positive"));
        }

        let a = &self.accent;
        if !(a.duration > 0.0) {
            return Err(ConfigError::invalid("accent.duration", "must be positive"));
        }
        if a.partials.is_empty() {
            return Err(ConfigError::invalid("accent.partials", "must not be empty"));
        }

        if self.control.update_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "control.update_interval_secs",
                "must be positive",
            ));
        }
        if self.control.queue_capacity == 0 {
            return Err(ConfigError::invalid("control.queue_capacity", "must be at least 1"));
        }
        Ok(())
    }
}
