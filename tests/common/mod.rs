/*!
 * Common test utilities for the alexandria test suite
 */

use anyhow::Result;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use alexandria::app_config::Config;
use alexandria::audio::AudioFormat;
use alexandria::providers::mock::{MockScriptWriter, MockSynthesizer};
use alexandria::{PipelineOrchestrator, RenderedSegment, ScriptEntry, VoiceProfile, VoiceTable};

/// Routes library log output through the test harness; safe to call repeatedly
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Writes a constant-level WAV fixture of `ms` milliseconds
pub fn write_tone_wav(path: &Path, format: AudioFormat, ms: u64, level: f32) -> Result<PathBuf> {
    let samples = vec![level; format.frames_for_ms(ms) * format.channels as usize];
    RenderedSegment::new(0, "FIXTURE", samples, format).write_wav(path)?;
    Ok(path.to_path_buf())
}

/// Voice table giving every listed speaker a stock voice named after it
pub fn voice_table(speakers: &[&str]) -> VoiceTable {
    VoiceTable::new(
        speakers
            .iter()
            .map(|s| (s.to_string(), VoiceProfile::with_voice_id(s.to_lowercase())))
            .collect::<BTreeMap<_, _>>(),
    )
}

/// Default config writing into `output_dir`, with the connection test off
pub fn test_config(output_dir: &Path) -> Config {
    let mut config = Config::default();
    config.output_dir = output_dir.to_path_buf();
    config.synthesis.test_connection = false;
    config
}

/// Script entries from `(speaker, text)` pairs
pub fn entries(pairs: &[(&str, &str)]) -> Vec<ScriptEntry> {
    pairs
        .iter()
        .map(|(speaker, text)| ScriptEntry::new(*speaker, *text, ""))
        .collect()
}

/// Orchestrator over mock collaborators
pub fn mock_pipeline(
    config: &Config,
    voices: VoiceTable,
    writer: MockScriptWriter,
    synthesizer: MockSynthesizer,
) -> PipelineOrchestrator {
    PipelineOrchestrator::new(config, voices, Arc::new(writer), Arc::new(synthesizer))
}
