/*!
 * End-to-end driver: manuscript to script, script to units, units to audio.
 *
 * Failures are absorbed at the smallest scope that can absorb them. A
 * rewriting error costs one chunk; a synthesis error, a missing artifact or
 * an unconfigured speaker costs one unit. Only absent configuration, a
 * failed connection test or a failure to write the final artifacts abort
 * the run.
 */

use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use super::progress::{NoProgress, PipelineProgress, PipelineStage};
use super::report::{format_duration, PipelineReport, PipelineStats, RunOutcome};
use crate::app_config::{Config, PipelineSettings, SynthesisConfig};
use crate::audio::{AudioAssembler, PauseSettings, RenderedSegment};
use crate::errors::{ConfigError, PipelineError, ProviderError, UnitFailure};
use crate::file_utils::FileManager;
use crate::providers::rewriter::ScriptService;
use crate::providers::tts::HttpSynthesizer;
use crate::providers::{ScriptWriter, SynthesisRequest, Synthesizer};
use crate::script::entry::retain_valid;
use crate::script::{AudioUnit, ParseRecovery, ScriptEntry, ScriptEntryParser, SpeakerChunkGrouper, TextSegmenter};
use crate::voice_config::VoiceTable;

/// File name of the script artifact inside the output directory
pub const ANNOTATED_SCRIPT_FILE: &str = "annotated_script.json";

/// Subdirectory of the output directory holding per-unit files
pub const SEGMENTS_DIR: &str = "segments";

/// Phrase synthesised before the first unit to check the service
pub const CONNECTION_TEST_PHRASE: &str = "Testing, one two three.";

const PREVIEW_CHARS: usize = 60;

/// Sequences segmentation, rewriting, grouping, synthesis and assembly
pub struct PipelineOrchestrator {
    settings: PipelineSettings,
    synthesis: SynthesisConfig,
    output_dir: PathBuf,
    voices: VoiceTable,
    writer: Arc<dyn ScriptWriter>,
    synthesizer: Arc<dyn Synthesizer>,
    progress: Arc<dyn PipelineProgress>,
}

impl PipelineOrchestrator {
    /// Create an orchestrator around explicit collaborators
    pub fn new(
        config: &Config,
        voices: VoiceTable,
        writer: Arc<dyn ScriptWriter>,
        synthesizer: Arc<dyn Synthesizer>,
    ) -> Self {
        Self {
            settings: config.pipeline.clone(),
            synthesis: config.synthesis.clone(),
            output_dir: config.output_dir.clone(),
            voices,
            writer,
            synthesizer,
            progress: Arc::new(NoProgress),
        }
    }

    /// Create an orchestrator using the configured rewriting provider and HTTP synthesis service
    pub fn from_config(config: &Config, voices: VoiceTable) -> Result<Self, PipelineError> {
        let writer = Arc::new(ScriptService::new(config.rewriter.clone()));
        let synthesizer = HttpSynthesizer::new(&config.synthesis.endpoint, config.synthesis.timeout_secs)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(Self::new(config, voices, writer, Arc::new(synthesizer)))
    }

    /// Report stage progress to `progress`
    pub fn with_progress(mut self, progress: Arc<dyn PipelineProgress>) -> Self {
        self.progress = progress;
        self
    }

    /// Voice table in use
    pub fn voices(&self) -> &VoiceTable {
        &self.voices
    }

    /// Directory receiving every artifact
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Full run over a manuscript file
    pub async fn run(&self, manuscript_path: &Path) -> Result<PipelineReport, PipelineError> {
        let start_time = Instant::now();
        self.check_voices()?;

        let manuscript = std::fs::read_to_string(manuscript_path)?;
        let mut stats = PipelineStats::default();
        let entries = self.generate_script(&manuscript, &mut stats).await;
        if entries.is_empty() {
            warn!("No script entries were produced, nothing to synthesize");
            return Ok(Self::report(RunOutcome::NoScriptEntries, stats, None, start_time));
        }

        let script_path = self.write_script_artifact(&entries)?;
        let output_path = FileManager::generate_output_path(manuscript_path, &self.output_dir, "wav");
        let outcome = self.synthesize_script(entries, &output_path, &mut stats).await?;

        Ok(Self::report(outcome, stats, Some(script_path), start_time))
    }

    /// Rewriting stage only: produce and save the annotated script
    pub async fn write_script(&self, manuscript_path: &Path) -> Result<PipelineReport, PipelineError> {
        let start_time = Instant::now();
        let manuscript = std::fs::read_to_string(manuscript_path)?;

        let mut stats = PipelineStats::default();
        let entries = self.generate_script(&manuscript, &mut stats).await;
        if entries.is_empty() {
            warn!("No script entries were produced");
            return Ok(Self::report(RunOutcome::NoScriptEntries, stats, None, start_time));
        }

        let script_path = self.write_script_artifact(&entries)?;
        let outcome = RunOutcome::ScriptWritten {
            path: script_path.clone(),
        };
        Ok(Self::report(outcome, stats, Some(script_path), start_time))
    }

    /// Synthesis and assembly from an existing script
    pub async fn run_from_script(
        &self,
        entries: Vec<ScriptEntry>,
        output_path: &Path,
    ) -> Result<PipelineReport, PipelineError> {
        let start_time = Instant::now();
        self.check_voices()?;

        let entries = retain_valid(entries);
        let mut stats = PipelineStats {
            entries: entries.len(),
            ..Default::default()
        };
        if entries.is_empty() {
            warn!("The script has no usable entries");
            return Ok(Self::report(RunOutcome::NoScriptEntries, stats, None, start_time));
        }

        let outcome = self.synthesize_script(entries, output_path, &mut stats).await?;
        Ok(Self::report(outcome, stats, None, start_time))
    }

    /// Segment the manuscript and rewrite every chunk, one at a time.
    ///
    /// Chunk failures and unreadable responses are tallied in `stats` and
    /// contribute no entries.
    pub async fn generate_script(&self, manuscript: &str, stats: &mut PipelineStats) -> Vec<ScriptEntry> {
        let chunks = TextSegmenter::new(self.settings.max_chunk_chars).split(manuscript);
        stats.chunks = chunks.len();
        info!(
            "Split manuscript into {} chunk(s) of at most {} characters",
            chunks.len(),
            self.settings.max_chunk_chars
        );
        info!("Rewriting with {}", self.writer.name());

        let parser = ScriptEntryParser::new();
        let mut entries = Vec::new();
        self.progress.started(PipelineStage::Rewriting, chunks.len());

        for chunk in &chunks {
            let start_time = Instant::now();
            match self.writer.write_script(chunk).await {
                Ok(response) => {
                    let parsed = parser.parse(&response);
                    if parsed.was_malformed() {
                        stats.malformed_chunks += 1;
                    }
                    if parsed.recovery == ParseRecovery::Salvaged {
                        stats.salvaged_chunks += 1;
                    }
                    stats.discarded_entries += parsed.discarded;
                    info!(
                        "Chunk {}/{}: {} script entries in {}",
                        chunk.index + 1,
                        chunk.total,
                        parsed.entries.len(),
                        format_duration(start_time.elapsed())
                    );
                    entries.extend(parsed.entries);
                }
                Err(e) => {
                    stats.failed_chunks += 1;
                    error!("Chunk {}/{} failed: {}", chunk.index + 1, chunk.total, e);
                }
            }
            self.progress.advanced(PipelineStage::Rewriting);
        }

        self.progress.finished(PipelineStage::Rewriting);
        stats.entries = entries.len();
        entries
    }

    /// Save `entries` as pretty JSON in the output directory
    pub fn write_script_artifact(&self, entries: &[ScriptEntry]) -> Result<PathBuf, PipelineError> {
        let path = self.output_dir.join(ANNOTATED_SCRIPT_FILE);
        let json = serde_json::to_string_pretty(entries)?;
        FileManager::write_to_file(&path, &json).map_err(|e| PipelineError::Artifact(format!("{:#}", e)))?;
        info!("Annotated script saved to: {}", path.display());
        Ok(path)
    }

    /// Read a script artifact back, trimming fields and dropping invalid entries
    pub fn load_script_artifact(path: &Path) -> Result<Vec<ScriptEntry>, PipelineError> {
        let content = FileManager::read_to_string(path).map_err(|e| PipelineError::Artifact(format!("{:#}", e)))?;
        let entries: Vec<ScriptEntry> = serde_json::from_str(&content)?;
        Ok(retain_valid(
            entries
                .into_iter()
                .map(|e| ScriptEntry::new(e.speaker, e.text, e.style))
                .collect(),
        ))
    }

    /// Group entries into units using the configured budget and oversize policy
    pub fn group(&self, entries: Vec<ScriptEntry>) -> Vec<AudioUnit> {
        SpeakerChunkGrouper::new(self.settings.unit_char_budget)
            .with_oversize_policy(self.settings.oversize_policy)
            .group(entries)
    }

    /// Synthesise the test phrase with the first complete voice
    pub async fn test_connection(&self, work_dir: &Path) -> Result<(), PipelineError> {
        let (speaker, voice) = self.voices.first_complete().ok_or_else(|| {
            ConfigError::ConfigurationMissing("no speaker has a complete voice profile".to_string())
        })?;
        info!("Testing synthesis connection with the voice of {}...", speaker);

        let request = SynthesisRequest::new(0, speaker, CONNECTION_TEST_PHRASE, "", voice);
        let path = self
            .synthesizer
            .synthesize(&request, work_dir)
            .await
            .map_err(PipelineError::ConnectionTest)?;
        if !FileManager::file_exists(&path) {
            return Err(PipelineError::ConnectionTest(ProviderError::MissingArtifact(path)));
        }

        info!("Synthesis connection OK");
        Ok(())
    }

    /// Render every unit, returning the survivors in unit order.
    ///
    /// At most `synthesis.concurrent_requests` units are in flight; with the
    /// default of 1 the units are rendered strictly one after another.
    pub async fn synthesize_units(
        &self,
        units: &[AudioUnit],
        work_dir: &Path,
        stats: &mut PipelineStats,
    ) -> Vec<RenderedSegment> {
        let total = units.len();
        let concurrency = self.synthesis.concurrent_requests.max(1);
        self.progress.started(PipelineStage::Synthesis, total);

        let mut results = stream::iter(units)
            .map(|unit| async move {
                let result = self.synthesize_unit(unit, total, work_dir).await;
                match &result {
                    Ok(segment) => info!(
                        "[{}/{}] done ({:.2}s of audio)",
                        unit.index + 1,
                        total,
                        segment.duration().as_secs_f64()
                    ),
                    Err(failure) if failure.is_skip() => {
                        warn!("[{}/{}] Skipping {}: {}", unit.index + 1, total, unit.speaker, failure)
                    }
                    Err(failure) => error!("[{}/{}] {}: {}", unit.index + 1, total, unit.speaker, failure),
                }
                self.progress.advanced(PipelineStage::Synthesis);
                (unit.index, result)
            })
            .buffer_unordered(concurrency)
            .collect::<Vec<_>>()
            .await;

        self.progress.finished(PipelineStage::Synthesis);

        // Completion order is arbitrary under concurrency
        results.sort_by_key(|(index, _)| *index);

        let mut segments = Vec::with_capacity(results.len());
        for (_, result) in results {
            match result {
                Ok(segment) => {
                    stats.successful += 1;
                    segments.push(segment);
                }
                Err(_) => stats.failed += 1,
            }
        }
        segments
    }

    /// Render one unit: resolve its voice, call the synthesizer once, read the result back.
    async fn synthesize_unit(
        &self,
        unit: &AudioUnit,
        total: usize,
        work_dir: &Path,
    ) -> Result<RenderedSegment, UnitFailure> {
        info!(
            "[{}/{}] {} ({} chars): '{}'",
            unit.index + 1,
            total,
            unit.speaker,
            unit.char_len(),
            unit.preview(PREVIEW_CHARS)
        );

        let voice = self.voices.resolve(&unit.speaker)?;
        let request = SynthesisRequest::new(unit.index, &unit.speaker, &unit.text, &unit.style, voice);
        let path = self.synthesizer.synthesize(&request, work_dir).await?;
        if !FileManager::file_exists(&path) {
            return Err(ProviderError::MissingArtifact(path).into());
        }

        let segment = RenderedSegment::load_wav(&path, unit.index, &unit.speaker)?;
        if self.settings.persist_segments {
            self.persist_segment(&path, unit);
        }
        Ok(segment)
    }

    /// Keep a copy of a rendered unit; failure is logged and does not drop the unit.
    fn persist_segment(&self, rendered: &Path, unit: &AudioUnit) {
        let target = self
            .output_dir
            .join(SEGMENTS_DIR)
            .join(FileManager::segment_file_name(unit.index, &unit.speaker, "wav"));

        match FileManager::copy_file(rendered, &target) {
            Ok(()) => debug!("Saved segment to {}", target.display()),
            Err(e) => warn!("Could not keep segment for unit {}: {:#}", unit.index + 1, e),
        }
    }

    /// Group, synthesise and assemble; the shared tail of every run that makes audio
    async fn synthesize_script(
        &self,
        entries: Vec<ScriptEntry>,
        output_path: &Path,
        stats: &mut PipelineStats,
    ) -> Result<RunOutcome, PipelineError> {
        let entry_count = entries.len();
        let units = self.group(entries);
        stats.units = units.len();
        info!(
            "Grouped {} script entries into {} audio units (budget {} chars)",
            entry_count,
            units.len(),
            self.settings.unit_char_budget
        );

        std::fs::create_dir_all(&self.output_dir)?;
        let work_dir = tempfile::Builder::new()
            .prefix(".synthesis_")
            .tempdir_in(&self.output_dir)?;

        if self.synthesis.test_connection {
            self.test_connection(work_dir.path()).await?;
        }

        let segments = self.synthesize_units(&units, work_dir.path(), stats).await;
        info!("Successful: {}, Failed: {}", stats.successful, stats.failed);

        if segments.is_empty() {
            warn!("No audio segments were generated.");
            return Ok(RunOutcome::NoContentProduced);
        }

        let assembler = AudioAssembler::new(PauseSettings::new(
            self.settings.cross_speaker_pause_ms,
            self.settings.same_speaker_pause_ms,
        ));
        let track = assembler.assemble(segments)?;
        track.write_wav(output_path)?;

        let duration = track.duration();
        info!(
            "Final audio saved to: {} ({})",
            output_path.display(),
            format_duration(duration)
        );
        Ok(RunOutcome::Assembled {
            path: output_path.to_path_buf(),
            duration,
        })
    }

    fn check_voices(&self) -> Result<(), PipelineError> {
        if self.voices.is_empty() {
            return Err(ConfigError::ConfigurationMissing("the voice table has no speakers".to_string()).into());
        }
        Ok(())
    }

    fn report(
        outcome: RunOutcome,
        stats: PipelineStats,
        script_path: Option<PathBuf>,
        start_time: Instant,
    ) -> PipelineReport {
        PipelineReport {
            outcome,
            stats,
            script_path,
            elapsed: start_time.elapsed(),
        }
    }
}
