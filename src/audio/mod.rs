/*!
 * Audio stage: decoding rendered units and assembling the final track.
 */

pub mod assembler;
pub mod segment;

pub use assembler::{AssembledTrack, AudioAssembler, PauseSettings};
pub use segment::{AudioFormat, RenderedSegment};
