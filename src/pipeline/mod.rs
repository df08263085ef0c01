/*!
 * Pipeline orchestration.
 *
 * - `orchestrator`: drives both collaborators and the audio stage
 * - `progress`: stage progress seam for the binary's progress bars
 * - `report`: counters and outcomes of a run
 */

pub mod orchestrator;
pub mod progress;
pub mod report;

pub use orchestrator::{PipelineOrchestrator, ANNOTATED_SCRIPT_FILE, CONNECTION_TEST_PHRASE, SEGMENTS_DIR};
pub use progress::{NoProgress, PipelineProgress, PipelineStage};
pub use report::{format_duration, PipelineReport, PipelineStats, RunOutcome};
