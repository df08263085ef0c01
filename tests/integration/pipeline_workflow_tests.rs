/*!
 * End-to-end pipeline runs over mock collaborators
 */

use std::time::Duration;

use alexandria::audio::AudioFormat;
use alexandria::errors::ConfigError;
use alexandria::pipeline::{CONNECTION_TEST_PHRASE, SEGMENTS_DIR};
use alexandria::providers::mock::{MockScriptWriter, MockSynthesizer, SynthesisBehavior};
use alexandria::providers::SynthesisRequest;
use alexandria::script::Chunk;
use alexandria::{PipelineError, PipelineStats, RenderedSegment, RunOutcome, VoiceTable};

use crate::common;

fn alice_and_bob(_: &Chunk) -> String {
    r#"[{"speaker": "ALICE", "text": "hi"}, {"speaker": "BOB", "text": "hi back"}]"#.to_string()
}

fn duration_by_speaker(request: &SynthesisRequest) -> u64 {
    match request.speaker.as_str() {
        "ALICE" => 300,
        _ => 200,
    }
}

fn duration_by_index(request: &SynthesisRequest) -> u64 {
    100 + 50 * request.index as u64
}

fn fails_for_bob(request: &SynthesisRequest) -> bool {
    request.speaker == "BOB"
}

/// Two speakers become two units joined by one cross-speaker pause
#[tokio::test]
async fn test_run_withTwoSpeakers_shouldAssembleTrackWithPause() {
    common::init_test_logging();
    let dir = common::create_temp_dir().unwrap();
    let manuscript = common::create_test_file(dir.path(), "chapter.txt", "Alice says hi. Bob says hi back.").unwrap();
    let mut config = common::test_config(&dir.path().join("out"));
    config.pipeline.max_chunk_chars = 1000;
    config.pipeline.unit_char_budget = 500;
    let synthesizer = MockSynthesizer::working().with_duration(duration_by_speaker);
    let pipeline = common::mock_pipeline(
        &config,
        common::voice_table(&["ALICE", "BOB"]),
        MockScriptWriter::working().with_custom_response(alice_and_bob),
        synthesizer.clone(),
    );

    let report = pipeline.run(&manuscript).await.unwrap();

    let expected_path = dir.path().join("out").join("chapter_audiobook.wav");
    assert_eq!(
        report.outcome,
        RunOutcome::Assembled {
            path: expected_path.clone(),
            duration: Duration::from_millis(300 + 500 + 200),
        }
    );
    assert_eq!(report.stats.chunks, 1);
    assert_eq!(report.stats.units, 2);
    assert_eq!((report.stats.successful, report.stats.failed), (2, 0));
    assert!(report.script_path.as_ref().is_some_and(|p| p.exists()));

    let track = RenderedSegment::load_wav(&expected_path, 0, "TRACK").unwrap();
    assert_eq!(track.duration(), Duration::from_millis(1000));

    let spoken: Vec<(String, String)> = synthesizer
        .requests()
        .into_iter()
        .map(|r| (r.speaker, r.text))
        .collect();
    assert_eq!(
        spoken,
        vec![
            ("ALICE".to_string(), "hi".to_string()),
            ("BOB".to_string(), "hi back".to_string())
        ]
    );
}

#[tokio::test]
async fn test_run_shouldPersistNumberedSegments() {
    let dir = common::create_temp_dir().unwrap();
    let manuscript = common::create_test_file(dir.path(), "chapter.txt", "Alice says hi.").unwrap();
    let config = common::test_config(dir.path());
    let pipeline = common::mock_pipeline(
        &config,
        common::voice_table(&["ALICE", "BOB"]),
        MockScriptWriter::working().with_custom_response(alice_and_bob),
        MockSynthesizer::working(),
    );

    pipeline.run(&manuscript).await.unwrap();

    let segments = dir.path().join(SEGMENTS_DIR);
    assert!(segments.join("0000_alice.wav").is_file());
    assert!(segments.join("0001_bob.wav").is_file());
}

#[tokio::test]
async fn test_run_withPersistenceDisabled_shouldKeepNoSegments() {
    let dir = common::create_temp_dir().unwrap();
    let manuscript = common::create_test_file(dir.path(), "chapter.txt", "Alice says hi.").unwrap();
    let mut config = common::test_config(dir.path());
    config.pipeline.persist_segments = false;
    let pipeline = common::mock_pipeline(
        &config,
        common::voice_table(&["ALICE", "BOB"]),
        MockScriptWriter::working().with_custom_response(alice_and_bob),
        MockSynthesizer::working(),
    );

    let report = pipeline.run(&manuscript).await.unwrap();

    assert!(report.outcome.is_success());
    assert!(!dir.path().join(SEGMENTS_DIR).exists());
}

/// When every unit fails there is no track, and that is not an error
#[tokio::test]
async fn test_run_withFailingSynthesizer_shouldProduceNoContent() {
    let dir = common::create_temp_dir().unwrap();
    let manuscript = common::create_test_file(dir.path(), "chapter.txt", "Alice says hi.").unwrap();
    let config = common::test_config(dir.path());
    let pipeline = common::mock_pipeline(
        &config,
        common::voice_table(&["ALICE", "BOB"]),
        MockScriptWriter::working().with_custom_response(alice_and_bob),
        MockSynthesizer::failing(),
    );

    let report = pipeline.run(&manuscript).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::NoContentProduced);
    assert_eq!((report.stats.successful, report.stats.failed), (0, 2));
    assert!(!dir.path().join("chapter_audiobook.wav").exists());
    assert!(report.summary().contains("No audio segments were generated."));
}

#[tokio::test]
async fn test_runFromScript_withUnconfiguredSpeaker_shouldSkipWithoutRequest() {
    let dir = common::create_temp_dir().unwrap();
    let config = common::test_config(dir.path());
    let synthesizer = MockSynthesizer::working().with_duration(duration_by_speaker);
    let pipeline = common::mock_pipeline(
        &config,
        common::voice_table(&["ALICE"]),
        MockScriptWriter::working(),
        synthesizer.clone(),
    );
    let script = common::entries(&[("ALICE", "hi"), ("BOB", "hi back"), ("ALICE", "bye")]);

    let report = pipeline.run_from_script(script, &dir.path().join("out.wav")).await.unwrap();

    assert_eq!(report.stats.units, 3);
    assert_eq!((report.stats.successful, report.stats.failed), (2, 1));
    assert_eq!(synthesizer.request_count(), 2);
    // The skipped unit leaves a same-speaker join behind
    assert!(matches!(
        report.outcome,
        RunOutcome::Assembled { duration, .. } if duration == Duration::from_millis(300 + 250 + 300)
    ));
}

#[tokio::test]
async fn test_runFromScript_withFailingSpeaker_shouldKeepOthers() {
    let dir = common::create_temp_dir().unwrap();
    let config = common::test_config(dir.path());
    let pipeline = common::mock_pipeline(
        &config,
        common::voice_table(&["ALICE", "BOB"]),
        MockScriptWriter::working(),
        MockSynthesizer::working().with_failure_when(fails_for_bob),
    );
    let script = common::entries(&[("ALICE", "hi"), ("BOB", "hi back")]);

    let report = pipeline.run_from_script(script, &dir.path().join("out.wav")).await.unwrap();

    assert_eq!((report.stats.successful, report.stats.failed), (1, 1));
    assert!(matches!(
        report.outcome,
        RunOutcome::Assembled { duration, .. } if duration == Duration::from_millis(100)
    ));
}

#[tokio::test]
async fn test_runFromScript_withMissingOrUnreadableOutput_shouldCountFailures() {
    for synthesizer in [MockSynthesizer::missing_output(), MockSynthesizer::unreadable()] {
        let dir = common::create_temp_dir().unwrap();
        let config = common::test_config(dir.path());
        let pipeline = common::mock_pipeline(
            &config,
            common::voice_table(&["ALICE", "BOB"]),
            MockScriptWriter::working(),
            synthesizer,
        );
        let script = common::entries(&[("ALICE", "hi"), ("BOB", "hi back")]);

        let report = pipeline.run_from_script(script, &dir.path().join("out.wav")).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::NoContentProduced);
        assert_eq!(report.stats.failed, 2);
    }
}

/// Concurrent synthesis still returns segments in unit order
#[tokio::test]
async fn test_synthesizeUnits_withConcurrency_shouldPreserveOrder() {
    let dir = common::create_temp_dir().unwrap();
    let mut config = common::test_config(dir.path());
    config.synthesis.concurrent_requests = 4;
    let synthesizer = MockSynthesizer::new(SynthesisBehavior::Slow { delay_ms: 10 }).with_duration(duration_by_index);
    let pipeline = common::mock_pipeline(
        &config,
        common::voice_table(&["A", "B"]),
        MockScriptWriter::working(),
        synthesizer.clone(),
    );
    let script = common::entries(&[
        ("A", "one"),
        ("B", "two"),
        ("A", "three"),
        ("B", "four"),
        ("A", "five"),
        ("B", "six"),
        ("A", "seven"),
        ("B", "eight"),
    ]);
    let units = pipeline.group(script);
    let mut stats = PipelineStats::default();

    let segments = pipeline.synthesize_units(&units, dir.path(), &mut stats).await;

    assert_eq!(segments.len(), 8);
    assert_eq!(stats.successful, 8);
    assert_eq!(synthesizer.request_count(), 8);
    for (i, segment) in segments.iter().enumerate() {
        assert_eq!(segment.index, i);
        assert_eq!(segment.speaker, if i % 2 == 0 { "A" } else { "B" });
        assert_eq!(segment.duration(), Duration::from_millis(100 + 50 * i as u64));
    }
}

#[tokio::test]
async fn test_runFromScript_withStereoSynthesizer_shouldKeepItsFormat() {
    let dir = common::create_temp_dir().unwrap();
    let config = common::test_config(dir.path());
    let pipeline = common::mock_pipeline(
        &config,
        common::voice_table(&["A"]),
        MockScriptWriter::working(),
        MockSynthesizer::working().with_format(AudioFormat::new(24000, 2)),
    );

    let output = dir.path().join("out.wav");
    let report = pipeline
        .run_from_script(common::entries(&[("A", "one")]), &output)
        .await
        .unwrap();

    assert!(report.outcome.is_success());
    let track = RenderedSegment::load_wav(&output, 0, "TRACK").unwrap();
    assert_eq!(track.format, AudioFormat::new(24000, 2));
    assert_eq!(track.duration(), Duration::from_millis(100));
}

#[tokio::test]
async fn test_run_withConnectionTest_shouldSpeakTestPhraseFirst() {
    let dir = common::create_temp_dir().unwrap();
    let manuscript = common::create_test_file(dir.path(), "chapter.txt", "Alice says hi.").unwrap();
    let mut config = common::test_config(dir.path());
    config.synthesis.test_connection = true;
    let synthesizer = MockSynthesizer::working();
    let pipeline = common::mock_pipeline(
        &config,
        common::voice_table(&["ALICE", "BOB"]),
        MockScriptWriter::working().with_custom_response(alice_and_bob),
        synthesizer.clone(),
    );

    let report = pipeline.run(&manuscript).await.unwrap();

    assert!(report.outcome.is_success());
    let requests = synthesizer.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].text, CONNECTION_TEST_PHRASE);
    assert_eq!(requests[0].speaker, "ALICE");
    assert_eq!(report.stats.successful, 2);
}

#[tokio::test]
async fn test_run_withFailedConnectionTest_shouldAbortBeforeUnits() {
    let dir = common::create_temp_dir().unwrap();
    let manuscript = common::create_test_file(dir.path(), "chapter.txt", "Alice says hi.").unwrap();
    let mut config = common::test_config(dir.path());
    config.synthesis.test_connection = true;
    let synthesizer = MockSynthesizer::failing();
    let pipeline = common::mock_pipeline(
        &config,
        common::voice_table(&["ALICE", "BOB"]),
        MockScriptWriter::working().with_custom_response(alice_and_bob),
        synthesizer.clone(),
    );

    let result = pipeline.run(&manuscript).await;

    assert!(matches!(result, Err(PipelineError::ConnectionTest(_))));
    assert_eq!(synthesizer.request_count(), 1);
}

#[tokio::test]
async fn test_run_withEmptyVoiceTable_shouldFailBeforeAnyRequest() {
    let dir = common::create_temp_dir().unwrap();
    let manuscript = common::create_test_file(dir.path(), "chapter.txt", "Alice says hi.").unwrap();
    let config = common::test_config(dir.path());
    let writer = MockScriptWriter::working();
    let synthesizer = MockSynthesizer::working();
    let pipeline = common::mock_pipeline(&config, VoiceTable::default(), writer.clone(), synthesizer.clone());

    let result = pipeline.run(&manuscript).await;

    assert!(matches!(
        result,
        Err(PipelineError::Configuration(ConfigError::ConfigurationMissing(_)))
    ));
    assert_eq!(writer.request_count(), 0);
    assert_eq!(synthesizer.request_count(), 0);
}

#[tokio::test]
async fn test_run_withFailingWriter_shouldReportNoScriptEntries() {
    let dir = common::create_temp_dir().unwrap();
    let manuscript = common::create_test_file(
        dir.path(),
        "chapter.txt",
        "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.",
    )
    .unwrap();
    let mut config = common::test_config(dir.path());
    config.pipeline.max_chunk_chars = 20;
    let synthesizer = MockSynthesizer::working();
    let pipeline = common::mock_pipeline(
        &config,
        common::voice_table(&["NARRATOR"]),
        MockScriptWriter::failing(),
        synthesizer.clone(),
    );

    let report = pipeline.run(&manuscript).await.unwrap();

    assert_eq!(report.outcome, RunOutcome::NoScriptEntries);
    assert_eq!(report.stats.chunks, 3);
    assert_eq!(report.stats.failed_chunks, 3);
    assert!(report.script_path.is_none());
    assert_eq!(synthesizer.request_count(), 0);
}

#[test]
fn test_run_withMissingManuscript_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let config = common::test_config(dir.path());
    let pipeline = common::mock_pipeline(
        &config,
        common::voice_table(&["NARRATOR"]),
        MockScriptWriter::working(),
        MockSynthesizer::working(),
    );

    let result = tokio_test::block_on(async { pipeline.run(&dir.path().join("missing.txt")).await });

    assert!(matches!(result, Err(PipelineError::Io(_))));
}
