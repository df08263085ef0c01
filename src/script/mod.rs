/*!
 * Script stage: manuscript segmentation, rewriter prompting, response
 * decoding and speaker-aware grouping into synthesis units.
 */

pub mod entry;
pub mod grouper;
pub mod parser;
pub mod prompts;
pub mod segmenter;

pub use entry::{speaker_census, ScriptEntry};
pub use grouper::{AudioUnit, OversizePolicy, SpeakerChunkGrouper};
pub use parser::{ParseRecovery, ParsedScript, ScriptEntryParser};
pub use prompts::ScriptPromptBuilder;
pub use segmenter::{Chunk, ChunkPosition, TextSegmenter};
