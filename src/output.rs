//! Hardware output through cpal.
//!
//! The orchestra renders mono. The stream callback renders into a
//! preallocated scratch buffer and copies each frame to every device
//! channel when the device would not open a mono stream. The callback
//! never allocates, locks or logs.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use tracing::{debug, info, warn};

use crate::config::OrchestraConfig;
use crate::error::{OrchestraError, Result};
use crate::link::{FrameCounter, RealtimeOrchestra, SnapshotInbox};
use crate::orchestra::Orchestra;

/// A running output stream. Audio stops when this is dropped.
pub struct AudioDriver {
    stream: cpal::Stream,
    device_name: String,
    sample_rate: u32,
    channels: u16,
    counter: FrameCounter,
}

impl AudioDriver {
    /// Open the default output device and start playing.
    ///
    /// When the device has no mono stream at `config.sample_rate`, its
    /// default rate wins; the orchestra is built for whatever rate the
    /// stream actually runs at.
    pub fn start(config: &OrchestraConfig, inbox: SnapshotInbox) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| OrchestraError::device("no audio output device available"))?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".into());

        let supported = negotiate(&device, config.sample_rate)?;
        let sample_format = supported.sample_format();
        let stream_config: cpal::StreamConfig = supported.into();
        let sample_rate = stream_config.sample_rate.0;
        let channels = stream_config.channels;

        if sample_rate != config.sample_rate {
            info!(
                requested = config.sample_rate,
                actual = sample_rate,
                "device runs at a different rate, following the device"
            );
        }
        let config = config.with_sample_rate(sample_rate);

        let realtime = RealtimeOrchestra::new(Orchestra::new(&config), inbox);
        let counter = realtime.frame_counter();
        let block = config.block_size.max(1);

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, realtime, block)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, realtime, block)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, realtime, block)?,
            other => {
                return Err(OrchestraError::device(format!("unsupported sample format: {other:?}")));
            }
        };

        stream
            .play()
            .map_err(|e| OrchestraError::device(format!("failed to play audio stream: {e}")))?;

        info!(
            device = %device_name,
            sample_rate,
            channels,
            format = ?sample_format,
            "audio stream started"
        );

        Ok(AudioDriver {
            stream,
            device_name,
            sample_rate,
            channels,
            counter,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Frames rendered so far, as last published by the callback.
    pub fn frame_counter(&self) -> FrameCounter {
        self.counter.clone()
    }

    /// Stop the stream and release the device.
    pub fn stop(self) {
        if let Err(e) = self.stream.pause() {
            debug!("pausing stream before drop failed: {e}");
        }
        drop(self.stream);
        debug!(frames = self.counter.frames(), "audio stream stopped");
    }
}

fn is_renderable(format: cpal::SampleFormat) -> bool {
    matches!(
        format,
        cpal::SampleFormat::F32 | cpal::SampleFormat::I16 | cpal::SampleFormat::U16
    )
}

/// Prefer a mono stream at the configured rate; otherwise take the device
/// default and duplicate the mono signal across its channels.
fn negotiate(device: &cpal::Device, sample_rate: u32) -> Result<cpal::SupportedStreamConfig> {
    let wanted = cpal::SampleRate(sample_rate);
    if let Ok(ranges) = device.supported_output_configs() {
        for range in ranges {
            if range.channels() == 1
                && is_renderable(range.sample_format())
                && range.min_sample_rate() <= wanted
                && wanted <= range.max_sample_rate()
            {
                return Ok(range.with_sample_rate(wanted));
            }
        }
    }
    debug!("device offers no mono stream at {sample_rate} Hz, using its default");
    device
        .default_output_config()
        .map_err(|e| OrchestraError::device(format!("failed to get default output config: {e}")))
}

fn build_stream<T>(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    mut realtime: RealtimeOrchestra,
    block: usize,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = usize::from(stream_config.channels.max(1));
    let mut mono = vec![0.0f32; block];

    device
        .build_output_stream(
            stream_config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for frames in data.chunks_mut(block * channels) {
                    let mono = &mut mono[..frames.len() / channels];
                    realtime.process(mono);
                    for (frame, &sample) in frames.chunks_exact_mut(channels).zip(mono.iter()) {
                        frame.fill(T::from_sample(sample));
                    }
                }
            },
            |err| warn!("audio stream error: {err}"),
            None,
        )
        .map_err(|e| OrchestraError::device(format!("failed to build audio stream: {e}")))
}

/// Name and channel count of each output device on the default host.
pub fn list_output_devices() -> Result<Vec<(String, u16)>> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| OrchestraError::device(format!("failed to enumerate devices: {e}")))?;

    let mut found = Vec::new();
    for device in devices {
        let name = device.name().unwrap_or_else(|_| "unknown".into());
        let channels = match device.default_output_config() {
            Ok(config) => config.channels(),
            Err(e) => {
                debug!(device = %name, "no default output config: {e}");
                continue;
            }
        };
        found.push((name, channels));
    }
    Ok(found)
}
