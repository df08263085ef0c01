/*!
 * Tests for track assembly
 */

use std::time::Duration;

use alexandria::audio::{AudioFormat, PauseSettings};
use alexandria::{AudioAssembler, AudioError, RenderedSegment};

use crate::common;

fn tone(index: usize, speaker: &str, ms: u64) -> RenderedSegment {
    let format = AudioFormat::new(16000, 1);
    let samples = vec![0.5; format.frames_for_ms(ms)];
    RenderedSegment::new(index, speaker, samples, format)
}

/// N segments get N-1 pauses, each chosen by comparing with the previous speaker
#[test]
fn test_assemble_shouldInsertSpeakerAwarePauses() {
    let speakers = ["A", "A", "B", "B", "B", "A", "C"];
    let segments: Vec<RenderedSegment> = speakers
        .iter()
        .enumerate()
        .map(|(i, s)| tone(i, s, 100))
        .collect();
    let pauses = PauseSettings::new(500, 250);

    let track = AudioAssembler::new(pauses).assemble(segments).unwrap();

    let expected: Vec<u64> = speakers
        .windows(2)
        .map(|w| if w[0] == w[1] { 250 } else { 500 })
        .collect();
    assert_eq!(track.pauses_ms, expected);
    assert_eq!(track.segment_count, speakers.len());

    let total_ms = 100 * speakers.len() as u64 + expected.iter().sum::<u64>();
    assert_eq!(track.duration(), Duration::from_millis(total_ms));
}

#[test]
fn test_assemble_withNoSegments_shouldReportNothingToAssemble() {
    let result = AudioAssembler::default().assemble(Vec::new());

    assert!(matches!(result, Err(AudioError::NothingToAssemble)));
}

#[test]
fn test_assemble_withSingleSegment_shouldAddNoSilence() {
    let track = AudioAssembler::default().assemble(vec![tone(0, "A", 300)]).unwrap();

    assert!(track.pauses_ms.is_empty());
    assert_eq!(track.duration(), Duration::from_millis(300));
    assert!(track.samples.iter().all(|&s| s == 0.5));
}

#[test]
fn test_assemble_withZeroPauses_shouldConcatenateDirectly() {
    let track = AudioAssembler::new(PauseSettings::new(0, 0))
        .assemble(vec![tone(0, "A", 100), tone(1, "B", 100)])
        .unwrap();

    assert_eq!(track.pauses_ms, vec![0]);
    assert_eq!(track.duration(), Duration::from_millis(200));
}

#[test]
fn test_writeWav_shouldProduceReadableTrack() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("track.wav");
    let first = common::write_tone_wav(&dir.path().join("a.wav"), AudioFormat::new(16000, 1), 200, 0.3).unwrap();
    let second = common::write_tone_wav(&dir.path().join("b.wav"), AudioFormat::new(16000, 1), 100, 0.3).unwrap();
    let segments = vec![
        RenderedSegment::load_wav(&first, 0, "A").unwrap(),
        RenderedSegment::load_wav(&second, 1, "B").unwrap(),
    ];

    let track = AudioAssembler::default().assemble(segments).unwrap();
    track.write_wav(&path).unwrap();
    let reloaded = RenderedSegment::load_wav(&path, 0, "TRACK").unwrap();

    assert_eq!(reloaded.duration(), Duration::from_millis(800));
    assert_eq!(reloaded.format, AudioFormat::new(16000, 1));
}
