/*!
 * Tests for application and voice configuration
 */

use anyhow::Result;

use alexandria::app_config::{Config, RewriterProvider};
use alexandria::audio::AudioFormat;
use alexandria::errors::ConfigError;
use alexandria::script::OversizePolicy;
use alexandria::VoiceTable;

use crate::common;

/// Test that a written config loads back with every section intact
#[test]
fn test_loadOrCreate_withExistingFile_shouldReadAllSections() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{
            "rewriter": {
                "provider": "anthropic",
                "available_providers": [
                    {"type": "anthropic", "model": "claude-3-5-haiku-latest", "api_key": "k", "endpoint": ""}
                ],
                "common": {"retry_count": 2}
            },
            "synthesis": {"endpoint": "http://tts:9000/speak", "concurrent_requests": 4},
            "pipeline": {"unit_char_budget": 300, "oversize_policy": "split"},
            "output_dir": "audio",
            "log_level": "debug"
        }"#,
    )?;

    let config = Config::load_or_create(&path)?;

    assert_eq!(config.rewriter.provider, RewriterProvider::Anthropic);
    assert_eq!(config.rewriter.common.retry_count, 2);
    assert_eq!(config.rewriter.get_api_key(), "k");
    assert_eq!(config.synthesis.concurrent_requests, 4);
    assert!(config.synthesis.test_connection);
    assert_eq!(config.pipeline.unit_char_budget, 300);
    assert_eq!(config.pipeline.max_chunk_chars, 4096);
    assert_eq!(config.pipeline.oversize_policy, OversizePolicy::Split);
    assert_eq!(config.output_dir, std::path::PathBuf::from("audio"));
    config.validate()?;

    Ok(())
}

/// Test that zero concurrency is rejected
#[test]
fn test_validate_withZeroConcurrency_shouldFail() {
    let mut config = Config::default();
    config.synthesis.concurrent_requests = 0;

    assert!(config.validate().is_err());
}

/// Test that a voice table with reference recordings loads and resolves relative paths
#[test]
fn test_voiceTable_load_withReferenceVoice_shouldBeComplete() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    std::fs::create_dir(temp_dir.path().join("voices"))?;
    common::write_tone_wav(
        &temp_dir.path().join("voices/ahab.wav"),
        AudioFormat::new(24000, 1),
        500,
        0.1,
    )?;
    let path = common::create_test_file(
        temp_dir.path(),
        "voice_config.json",
        r#"{
            "AHAB": {"ref_audio": "voices/ahab.wav", "ref_text": "Call me Ahab.", "style": "stern", "seed": "1234"},
            "ISHMAEL": {"ref_audio": "voices/missing.wav", "ref_text": "Call me Ishmael."}
        }"#,
    )?;

    let voices = VoiceTable::load(&path)?;

    assert!(voices.has_complete_voice("AHAB"));
    assert!(!voices.has_complete_voice("ISHMAEL"));
    assert_eq!(voices.lookup("ahab").map(|v| v.seed), Some(1234));
    assert_eq!(voices.first_complete().map(|(s, _)| s), Some("AHAB"));

    Ok(())
}

/// Test that malformed voice JSON is reported as invalid, not missing
#[test]
fn test_voiceTable_fromJson_withMalformedJson_shouldBeInvalid() {
    let result = VoiceTable::from_json("{\"AHAB\": ");

    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}
