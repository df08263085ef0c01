/*!
 * # Alexandria - manuscript to multi-speaker audio
 *
 * A Rust library that turns prose into a narrated, multi-voice audio track.
 *
 * ## Features
 *
 * - Split a manuscript into bounded chunks on paragraph and sentence boundaries
 * - Rewrite each chunk into an attributed script with an LLM:
 *   - Ollama (local LLM)
 *   - Anthropic API
 * - Tolerate fenced, truncated or freeform LLM output
 * - Merge consecutive same-speaker lines into bounded synthesis units
 * - Synthesise every unit with a per-speaker voice, skipping what cannot be voiced
 * - Assemble one WAV track with speaker-aware pauses
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `voice_config`: Speaker to voice mapping
 * - `script`: Segmentation, prompting, response parsing and grouping:
 *   - `script::segmenter`: Manuscript chunking
 *   - `script::parser`: Tolerant decoding of rewriter responses
 *   - `script::grouper`: Speaker-aware unit grouping
 * - `audio`: Rendered segments and track assembly
 * - `providers`: Rewriting and synthesis collaborators:
 *   - `providers::ollama`: Ollama API client
 *   - `providers::anthropic`: Anthropic API client
 *   - `providers::tts`: HTTP synthesis client
 * - `pipeline`: The orchestrator tying everything together
 * - `file_utils`: File system operations
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod audio;
pub mod errors;
pub mod file_utils;
pub mod pipeline;
pub mod providers;
pub mod script;
pub mod voice_config;

// Re-export main types for easier usage
pub use app_config::Config;
pub use audio::{AssembledTrack, AudioAssembler, RenderedSegment};
pub use errors::{AppError, AudioError, ConfigError, PipelineError, ProviderError, UnitFailure};
pub use pipeline::{PipelineOrchestrator, PipelineReport, PipelineStats, RunOutcome};
pub use script::{AudioUnit, ScriptEntry, ScriptEntryParser, SpeakerChunkGrouper, TextSegmenter};
pub use voice_config::{VoiceProfile, VoiceTable};
