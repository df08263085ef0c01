/*!
 * Outcome of a pipeline run.
 *
 * `PipelineStats` counts chunks, entries and units as they pass through the
 * stages; `PipelineReport` pairs those counters with how the run ended.
 */

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Counters accumulated over one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Manuscript chunks produced by segmentation
    pub chunks: usize,

    /// Chunks whose rewriting request failed outright
    pub failed_chunks: usize,

    /// Chunks whose response needed repair or could not be read at all
    pub malformed_chunks: usize,

    /// Malformed chunks from which a prefix of records was recovered
    pub salvaged_chunks: usize,

    /// Valid script entries collected
    pub entries: usize,

    /// Records dropped for lacking a speaker or text
    pub discarded_entries: usize,

    /// Audio units formed by grouping
    pub units: usize,

    /// Units rendered and kept
    pub successful: usize,

    /// Units dropped
    pub failed: usize,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// The combined track was written
    Assembled {
        /// Location of the track
        path: PathBuf,
        /// Playback length of the track
        duration: Duration,
    },

    /// Only the script stage ran and its artifact was written
    ScriptWritten {
        /// Location of the annotated script
        path: PathBuf,
    },

    /// The rewriting stage produced no usable entries
    NoScriptEntries,

    /// Every unit failed; nothing was assembled
    NoContentProduced,
}

impl RunOutcome {
    /// Whether the run produced the artifact it was asked for
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Assembled { .. } | Self::ScriptWritten { .. })
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assembled { path, duration } => write!(
                f,
                "Final audio saved to: {} ({})",
                path.display(),
                format_duration(*duration)
            ),
            Self::ScriptWritten { path } => write!(f, "Annotated script saved to: {}", path.display()),
            Self::NoScriptEntries => write!(f, "No script entries were produced by the rewriter."),
            Self::NoContentProduced => write!(f, "No audio segments were generated."),
        }
    }
}

/// Outcome plus counters for one run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// How the run ended
    pub outcome: RunOutcome,

    /// Counters
    pub stats: PipelineStats,

    /// Annotated script written during the run, if any
    pub script_path: Option<PathBuf>,

    /// Wall-clock time of the run
    pub elapsed: Duration,
}

impl PipelineReport {
    /// Multi-line human-readable summary
    pub fn summary(&self) -> String {
        let s = &self.stats;
        format!(
            "--- Generation Complete ---\n\
             Chunks: {} (failed: {}, malformed: {}, salvaged: {})\n\
             Script entries: {} (discarded: {})\n\
             Audio units: {}\n\
             Successful: {}, Failed: {}\n\
             Elapsed: {}\n\
             {}",
            s.chunks,
            s.failed_chunks,
            s.malformed_chunks,
            s.salvaged_chunks,
            s.entries,
            s.discarded_entries,
            s.units,
            s.successful,
            s.failed,
            format_duration(self.elapsed),
            self.outcome
        )
    }
}

/// Format a duration as `1h 2m 3s`, `2m 3s` or `3.250s`.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}.{:03}s", seconds, duration.subsec_millis())
    }
}
