//! Offline renderer - plays a snapshot through a fresh orchestra without an
//! audio device, to raw samples or a WAV file.

use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::info;

use crate::config::OrchestraConfig;
use crate::dsp::clock::SampleClock;
use crate::error::Result;
use crate::orchestra::Orchestra;
use crate::snapshot::DataSnapshot;

/// Render `seconds` of audio for `snapshot`, in driver-sized buffers of
/// `config.block_size` frames.
pub fn render_samples(config: &OrchestraConfig, snapshot: &DataSnapshot, seconds: f64) -> Vec<f32> {
    let mut orchestra = Orchestra::new(config);
    orchestra.retarget_all(snapshot);

    let total = SampleClock::seconds_to_frames(seconds, config.sample_rate) as usize;
    let mut out = vec![0.0f32; total];
    for buffer in out.chunks_mut(config.block_size.max(1)) {
        orchestra.render(buffer);
    }
    out
}

/// Render a snapshot straight to WAV bytes (16-bit mono PCM).
pub fn render_wav(config: &OrchestraConfig, snapshot: &DataSnapshot, seconds: f64) -> Result<Vec<u8>> {
    let samples = render_samples(config, snapshot, seconds);
    encode_wav(&samples, config.sample_rate)
}

fn wav_format(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

#[inline]
fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16
}

/// Encode mono f32 samples in [-1, 1] to a WAV byte buffer.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    let mut writer = WavWriter::new(&mut cursor, wav_format(sample_rate))?;
    for &sample in samples {
        writer.write_sample(to_i16(sample))?;
    }
    writer.finalize()?;
    Ok(cursor.into_inner())
}

/// Encode mono samples to a WAV file on disk.
pub fn write_wav_file(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let mut writer = WavWriter::create(path, wav_format(sample_rate))?;
    for &sample in samples {
        writer.write_sample(to_i16(sample))?;
    }
    writer.finalize()?;
    info!(
        path = %path.display(),
        frames = samples.len(),
        seconds = samples.len() as f64 / f64::from(sample_rate),
        "wrote wav"
    );
    Ok(())
}
