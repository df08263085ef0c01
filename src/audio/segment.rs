/*!
 * Decoded audio for one synthesized unit.
 *
 * Samples are held as interleaved `f32` in `[-1.0, 1.0]` regardless of the
 * source encoding, so segments from different voices can be mixed freely.
 */

use std::path::Path;
use std::time::Duration;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;

use crate::errors::AudioError;

/// Sample rate and channel layout of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Frames per second
    pub sample_rate: u32,

    /// Interleaved channels per frame
    pub channels: u16,
}

impl AudioFormat {
    /// Create a format.
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            channels: channels.max(1),
        }
    }

    /// Number of frames covering `ms` milliseconds, rounded to the nearest frame.
    pub fn frames_for_ms(&self, ms: u64) -> usize {
        ((self.sample_rate as u64 * ms + 500) / 1000) as usize
    }
}

/// Synthesized waveform for exactly one audio unit, tagged with its speaker.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSegment {
    /// Ordinal of the unit this segment renders
    pub index: usize,

    /// Speaker of the unit
    pub speaker: String,

    /// Interleaved samples
    pub samples: Vec<f32>,

    /// Layout of `samples`
    pub format: AudioFormat,
}

impl RenderedSegment {
    /// Create a segment from decoded samples.
    pub fn new(index: usize, speaker: impl Into<String>, samples: Vec<f32>, format: AudioFormat) -> Self {
        Self {
            index,
            speaker: speaker.into(),
            samples,
            format,
        }
    }

    /// A segment of digital silence lasting `ms` milliseconds.
    pub fn silence(index: usize, speaker: impl Into<String>, format: AudioFormat, ms: u64) -> Self {
        let samples = vec![0.0; format.frames_for_ms(ms) * format.channels as usize];
        Self::new(index, speaker, samples, format)
    }

    /// Decode a WAV file.
    pub fn load_wav(path: &Path, index: usize, speaker: impl Into<String>) -> Result<Self, AudioError> {
        let decode_error = |message: String| AudioError::Decode {
            path: path.to_path_buf(),
            message,
        };

        let mut reader = WavReader::open(path).map_err(|e| decode_error(e.to_string()))?;
        let spec = reader.spec();
        debug!("Loading WAV file: {:?}, spec: {:?}", path, spec);

        let samples: Result<Vec<f32>, hound::Error> = match spec.sample_format {
            SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|sample| sample as f32 / scale))
                    .collect()
            }
            SampleFormat::Float => reader.samples::<f32>().collect(),
        };
        let samples = samples.map_err(|e| decode_error(e.to_string()))?;

        Ok(Self::new(
            index,
            speaker,
            samples,
            AudioFormat::new(spec.sample_rate, spec.channels),
        ))
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.format.channels as usize
    }

    /// Playback length.
    pub fn duration(&self) -> Duration {
        frames_to_duration(self.frames(), self.format)
    }

    /// Convert to `target` layout, mixing channels and resampling linearly.
    pub fn conform(self, target: AudioFormat) -> Self {
        if self.format == target {
            return self;
        }
        debug!(
            "Converting segment {} from {:?} to {:?}",
            self.index, self.format, target
        );

        let channels = remap_channels(&self.samples, self.format.channels, target.channels);
        let samples = resample(&channels, target.channels, self.format.sample_rate, target.sample_rate);
        Self {
            samples,
            format: target,
            ..self
        }
    }

    /// Encode as 16-bit PCM WAV.
    pub fn write_wav(&self, path: &Path) -> Result<(), AudioError> {
        write_pcm16(path, &self.samples, self.format)
    }
}

/// Duration of `frames` frames at the format's rate.
pub fn frames_to_duration(frames: usize, format: AudioFormat) -> Duration {
    let rate = format.sample_rate as u64;
    let frames = frames as u64;
    Duration::from_secs(frames / rate) + Duration::from_nanos((frames % rate) * 1_000_000_000 / rate)
}

/// Write interleaved samples as a 16-bit PCM WAV file.
pub fn write_pcm16(path: &Path, samples: &[f32], format: AudioFormat) -> Result<(), AudioError> {
    let spec = WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(path, spec).map_err(|e| AudioError::Encode(e.to_string()))?;
    for sample in samples {
        let sample_i16 = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(sample_i16)
            .map_err(|e| AudioError::Encode(e.to_string()))?;
    }
    writer.finalize().map_err(|e| AudioError::Encode(e.to_string()))?;

    debug!("Saved WAV file: {:?}", path);
    Ok(())
}

/// Change the number of interleaved channels.
///
/// Mono is duplicated into every output channel; anything else is averaged
/// down to mono first.
fn remap_channels(samples: &[f32], from: u16, to: u16) -> Vec<f32> {
    if from == to {
        return samples.to_vec();
    }

    let mono: Vec<f32> = if from == 1 {
        samples.to_vec()
    } else {
        samples
            .chunks_exact(from as usize)
            .map(|frame| frame.iter().sum::<f32>() / from as f32)
            .collect()
    };

    if to == 1 {
        return mono;
    }
    mono.iter()
        .flat_map(|&sample| std::iter::repeat_n(sample, to as usize))
        .collect()
}

/// Simple linear interpolation resampling of interleaved audio.
fn resample(samples: &[f32], channels: u16, from_rate: u32, to_rate: u32) -> Vec<f32> {
    let channels = channels as usize;
    let frames = samples.len() / channels;
    if from_rate == to_rate || frames == 0 {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_frames = (frames as f64 / ratio).ceil() as usize;
    let mut output = Vec::with_capacity(output_frames * channels);

    for i in 0..output_frames {
        let source_pos = i as f64 * ratio;
        let source_idx = (source_pos.floor() as usize).min(frames - 1);
        let fraction = (source_pos - source_idx as f64) as f32;

        for channel in 0..channels {
            let left = samples[source_idx * channels + channel];
            if source_idx + 1 >= frames {
                output.push(left);
            } else {
                let right = samples[(source_idx + 1) * channels + channel];
                output.push(left + (right - left) * fraction);
            }
        }
    }
    output
}
