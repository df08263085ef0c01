/*!
 * Writing a script in one run and voicing it in another
 */

use std::time::Duration;

use alexandria::pipeline::ANNOTATED_SCRIPT_FILE;
use alexandria::providers::mock::{MockScriptWriter, MockSynthesizer};
use alexandria::script::Chunk;
use alexandria::{PipelineOrchestrator, RunOutcome, ScriptEntry};

use crate::common;

fn dialogue(_: &Chunk) -> String {
    r#"```json
[
  {"speaker": "NARRATOR", "text": "The door creaked.", "style": "hushed"},
  {"speaker": "ELENA", "text": "Who's there?"},
  {"speaker": "STRANGER", "text": "A friend."}
]
```"#
        .to_string()
}

#[tokio::test]
async fn test_writeScript_thenRunFromScript_shouldVoiceSavedEntries() {
    let dir = common::create_temp_dir().unwrap();
    let manuscript = common::create_test_file(dir.path(), "story.txt", "The door creaked. Who's there?").unwrap();
    let config = common::test_config(dir.path());
    let voices = common::voice_table(&["NARRATOR", "ELENA", "STRANGER"]);
    let synthesizer = MockSynthesizer::working();

    let writing = common::mock_pipeline(
        &config,
        voices.clone(),
        MockScriptWriter::working().with_custom_response(dialogue),
        MockSynthesizer::working(),
    );
    let report = writing.write_script(&manuscript).await.unwrap();

    let script_path = dir.path().join(ANNOTATED_SCRIPT_FILE);
    assert_eq!(report.outcome, RunOutcome::ScriptWritten { path: script_path.clone() });
    assert_eq!(report.stats.entries, 3);
    assert_eq!(report.stats.units, 0);

    let entries = PipelineOrchestrator::load_script_artifact(&script_path).unwrap();
    assert_eq!(entries[0], ScriptEntry::new("NARRATOR", "The door creaked.", "hushed"));

    let voicing = common::mock_pipeline(&config, voices, MockScriptWriter::failing(), synthesizer.clone());
    let output = dir.path().join("story.wav");
    let report = voicing.run_from_script(entries, &output).await.unwrap();

    assert_eq!(
        report.outcome,
        RunOutcome::Assembled {
            path: output.clone(),
            duration: Duration::from_millis(3 * 100 + 2 * 500),
        }
    );
    assert!(output.is_file());
    assert_eq!(synthesizer.requests()[0].style, "hushed");
}

/// An edited script is trimmed and cleaned on load
#[tokio::test]
async fn test_runFromScript_withHandEditedScript_shouldSkipBlankEntries() {
    let dir = common::create_temp_dir().unwrap();
    let script_path = common::create_test_file(
        dir.path(),
        ANNOTATED_SCRIPT_FILE,
        r#"[
            {"speaker": "ELENA", "text": "  First line. "},
            {"speaker": "ELENA", "text": "   "},
            {"speaker": " ELENA", "text": "Second line."}
        ]"#,
    )
    .unwrap();
    let config = common::test_config(dir.path());
    let synthesizer = MockSynthesizer::working();
    let pipeline = common::mock_pipeline(
        &config,
        common::voice_table(&["ELENA"]),
        MockScriptWriter::working(),
        synthesizer.clone(),
    );

    let entries = PipelineOrchestrator::load_script_artifact(&script_path).unwrap();
    let report = pipeline.run_from_script(entries, &dir.path().join("out.wav")).await.unwrap();

    assert_eq!(report.stats.entries, 2);
    assert_eq!(report.stats.units, 1);
    assert_eq!(synthesizer.requests()[0].text, "First line. Second line.");
}

#[test]
fn test_coverage_shouldFlagSpeakersWithoutVoices() {
    let script = common::entries(&[
        ("NARRATOR", "It began."),
        ("ELENA", "Hello."),
        ("NARRATOR", "She waved."),
        ("GHOST", "Boo."),
    ]);
    let voices = common::voice_table(&["NARRATOR", "ELENA"]);

    let coverage = voices.coverage(&script);

    let summary: Vec<(&str, usize, bool)> = coverage
        .iter()
        .map(|c| (c.speaker.as_str(), c.entries, c.issue.is_none()))
        .collect();
    assert_eq!(
        summary,
        vec![("ELENA", 1, true), ("GHOST", 1, false), ("NARRATOR", 2, true)]
    );
}

#[test]
fn test_loadScriptArtifact_withMissingFile_shouldFail() {
    let dir = common::create_temp_dir().unwrap();

    let result = PipelineOrchestrator::load_script_artifact(&dir.path().join("missing.json"));

    assert!(result.is_err());
}
