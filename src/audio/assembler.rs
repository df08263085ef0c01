/*!
 * Concatenation of rendered segments into one track.
 *
 * The first segment starts the track with no leading silence. Every later
 * segment is preceded by a pause whose length depends on whether its speaker
 * matches the segment immediately before it, so N segments produce exactly
 * N-1 pauses.
 */

use std::path::Path;
use std::time::Duration;

use log::{debug, info};

use super::segment::{frames_to_duration, write_pcm16, AudioFormat, RenderedSegment};
use crate::errors::AudioError;

/// Silence inserted between segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseSettings {
    /// Pause before a segment whose speaker differs from the previous one
    pub cross_speaker_ms: u64,

    /// Pause before a segment by the same speaker as the previous one
    pub same_speaker_ms: u64,
}

impl PauseSettings {
    /// Create pause settings.
    pub fn new(cross_speaker_ms: u64, same_speaker_ms: u64) -> Self {
        Self {
            cross_speaker_ms,
            same_speaker_ms,
        }
    }

    /// Pause to insert between `previous` and `next` speakers.
    pub fn between(&self, previous: &str, next: &str) -> u64 {
        if previous == next {
            self.same_speaker_ms
        } else {
            self.cross_speaker_ms
        }
    }
}

impl Default for PauseSettings {
    fn default() -> Self {
        Self::new(500, 250)
    }
}

/// The final concatenated audio.
#[derive(Debug, Clone)]
pub struct AssembledTrack {
    /// Interleaved samples
    pub samples: Vec<f32>,

    /// Layout shared by every part of the track
    pub format: AudioFormat,

    /// Number of segments in the track
    pub segment_count: usize,

    /// Inserted pauses in order, in milliseconds
    pub pauses_ms: Vec<u64>,
}

impl AssembledTrack {
    /// Number of frames.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.format.channels as usize
    }

    /// Playback length.
    pub fn duration(&self) -> Duration {
        frames_to_duration(self.frames(), self.format)
    }

    /// Encode as 16-bit PCM WAV.
    pub fn write_wav(&self, path: &Path) -> Result<(), AudioError> {
        write_pcm16(path, &self.samples, self.format)
    }
}

/// Joins rendered segments with speaker-sensitive pauses.
#[derive(Debug, Clone, Default)]
pub struct AudioAssembler {
    pauses: PauseSettings,
}

impl AudioAssembler {
    /// Create an assembler.
    pub fn new(pauses: PauseSettings) -> Self {
        Self { pauses }
    }

    /// Configured pauses.
    pub fn pauses(&self) -> PauseSettings {
        self.pauses
    }

    /// Concatenate `segments` in order.
    ///
    /// The track takes the first segment's format; later segments are
    /// converted to it. Empty input yields `AudioError::NothingToAssemble`.
    pub fn assemble(&self, segments: Vec<RenderedSegment>) -> Result<AssembledTrack, AudioError> {
        let mut segments = segments.into_iter();
        let first = segments.next().ok_or(AudioError::NothingToAssemble)?;
        let format = first.format;

        info!("Combining audio segments with pauses...");
        info!("  Pause between speakers: {}ms", self.pauses.cross_speaker_ms);
        info!("  Pause within same speaker: {}ms", self.pauses.same_speaker_ms);

        let mut previous_speaker = first.speaker;
        let mut samples = first.samples;
        let mut pauses_ms = Vec::new();

        for segment in segments {
            let pause_ms = self.pauses.between(&previous_speaker, &segment.speaker);
            let silence_len = format.frames_for_ms(pause_ms) * format.channels as usize;
            samples.resize(samples.len() + silence_len, 0.0);
            pauses_ms.push(pause_ms);

            let segment = segment.conform(format);
            samples.extend_from_slice(&segment.samples);
            previous_speaker = segment.speaker;
        }

        let track = AssembledTrack {
            samples,
            format,
            segment_count: pauses_ms.len() + 1,
            pauses_ms,
        };
        debug!(
            "Assembled {} segment(s) into {:.2}s of audio",
            track.segment_count,
            track.duration().as_secs_f64()
        );
        Ok(track)
    }
}
