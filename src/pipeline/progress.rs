/*!
 * Progress reporting seam.
 *
 * The library never draws anything itself; the binary plugs in progress
 * bars through this trait and tests use the silent default.
 */

use std::fmt;

/// Stage of a pipeline run that reports progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Manuscript chunks sent to the rewriter
    Rewriting,
    /// Audio units sent to the synthesizer
    Synthesis,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rewriting => write!(f, "chunks"),
            Self::Synthesis => write!(f, "units"),
        }
    }
}

/// Receiver for stage progress. Called from the pipeline's own task only
/// for `started`/`finished`; `advanced` may be called from concurrent
/// synthesis futures.
pub trait PipelineProgress: Send + Sync {
    /// A stage with `total` work items begins
    fn started(&self, stage: PipelineStage, total: usize);

    /// One work item of `stage` completed, successfully or not
    fn advanced(&self, stage: PipelineStage);

    /// The stage is done
    fn finished(&self, stage: PipelineStage);
}

/// Progress receiver that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl PipelineProgress for NoProgress {
    fn started(&self, _stage: PipelineStage, _total: usize) {}

    fn advanced(&self, _stage: PipelineStage) {}

    fn finished(&self, _stage: PipelineStage) {}
}
