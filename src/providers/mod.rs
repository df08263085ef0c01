/*!
 * External collaborators of the pipeline.
 *
 * This module contains the two service seams and their implementations:
 * - `ScriptWriter`: turns a manuscript chunk into a raw script response
 *   (Ollama and Anthropic clients behind `rewriter::ScriptService`)
 * - `Synthesizer`: renders one audio unit to a file (`tts::HttpSynthesizer`)
 * - `mock`: scriptable stand-ins for both, used by tests and benches
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use crate::errors::ProviderError;
use crate::script::Chunk;
use crate::voice_config::VoiceProfile;

/// Rewriting collaborator: prose in, raw script text out.
///
/// The response is returned unparsed; decoding and repair are the parser's job.
#[async_trait]
pub trait ScriptWriter: Send + Sync + Debug {
    /// Rewrite one chunk into a script response
    ///
    /// # Arguments
    /// * `chunk` - The chunk to rewrite, with its ordinal and total for positional hints
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The raw response text or an error
    async fn write_script(&self, chunk: &Chunk) -> Result<String, ProviderError>;

    /// Short provider name for logs
    fn name(&self) -> String;
}

/// One synthesis request: the unit's text plus the voice that should speak it.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    /// Ordinal of the unit being rendered
    pub index: usize,

    /// Speaker label
    pub speaker: String,

    /// Text to speak
    pub text: String,

    /// Resolved voice parameters
    pub voice: VoiceProfile,

    /// Delivery direction; the unit's style, else the voice's default style
    pub style: String,

    /// Reproducibility seed
    pub seed: i64,
}

impl SynthesisRequest {
    /// Build a request, falling back to the voice's default style when `style` is blank.
    pub fn new(
        index: usize,
        speaker: impl Into<String>,
        text: impl Into<String>,
        style: &str,
        voice: &VoiceProfile,
    ) -> Self {
        let style = if style.trim().is_empty() {
            voice.style.clone().unwrap_or_default()
        } else {
            style.trim().to_string()
        };

        Self {
            index,
            speaker: speaker.into(),
            text: text.into(),
            seed: voice.seed,
            voice: voice.clone(),
            style,
        }
    }
}

/// Speech synthesis collaborator.
#[async_trait]
pub trait Synthesizer: Send + Sync + Debug {
    /// Render one request to an audio file
    ///
    /// # Arguments
    /// * `request` - Text, voice, style and seed
    /// * `work_dir` - Directory where the synthesizer may place its output
    ///
    /// # Returns
    /// * `Result<PathBuf, ProviderError>` - Path of the rendered audio or an error
    async fn synthesize(&self, request: &SynthesisRequest, work_dir: &Path) -> Result<PathBuf, ProviderError>;
}

/// Delay before retry number `retry` (1-based): `base_ms` doubled per retry, capped at 2^16 and saturating.
pub(crate) fn backoff_delay_ms(base_ms: u64, retry: u32) -> u64 {
    base_ms.saturating_mul(1u64 << retry.saturating_sub(1).min(16))
}

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod rewriter;
pub mod tts;
