/*!
 * Tests for speaker-aware grouping into synthesis units
 */

use alexandria::script::{OversizePolicy, ScriptEntry, SpeakerChunkGrouper};

use crate::common;

fn text_of(len: usize) -> String {
    "a".repeat(len)
}

/// 200 + 200 merge into 401 chars; adding 150 would exceed 500
#[test]
fn test_group_withThreeSameSpeakerEntries_shouldMergeFirstTwo() {
    let entries = vec![
        ScriptEntry::new("NARRATOR", text_of(200), ""),
        ScriptEntry::new("NARRATOR", text_of(200), ""),
        ScriptEntry::new("NARRATOR", text_of(150), ""),
    ];

    let units = SpeakerChunkGrouper::new(500).group(entries);

    assert_eq!(units.len(), 2);
    assert_eq!(units[0].char_len(), 401);
    assert_eq!(units[1].char_len(), 150);
    assert_eq!((units[0].index, units[1].index), (0, 1));
}

#[test]
fn test_group_shouldNeverMixSpeakers() {
    let script = common::entries(&[
        ("ALICE", "hi"),
        ("BOB", "hi back"),
        ("ALICE", "how are you"),
        ("ALICE", "today"),
        ("NARRATOR", "She smiled."),
        ("BOB", "fine"),
    ]);

    let units = SpeakerChunkGrouper::new(500).group(script.clone());

    let speakers: Vec<&str> = units.iter().map(|u| u.speaker.as_str()).collect();
    assert_eq!(speakers, vec!["ALICE", "BOB", "ALICE", "NARRATOR", "BOB"]);
    assert_eq!(units[2].text, "how are you today");
    for unit in &units {
        for piece in unit.text.split(' ') {
            assert!(script.iter().any(|e| e.speaker == unit.speaker && e.text.contains(piece)));
        }
    }
}

/// Merging two adjacent same-speaker entries within budget saves exactly one unit
#[test]
fn test_group_adjacentMergeableEntries_shouldSaveOneUnit() {
    let merged = SpeakerChunkGrouper::new(20).group(common::entries(&[
        ("A", "first part"),
        ("A", "second"),
        ("B", "other"),
    ]));
    let unmerged = SpeakerChunkGrouper::new(20).group(common::entries(&[
        ("A", "first part"),
        ("B", "other"),
        ("A", "second"),
    ]));

    assert_eq!(merged.len() + 1, unmerged.len());
}

#[test]
fn test_group_shouldKeepFirstNonEmptyStyle() {
    let entries = vec![
        ScriptEntry::new("ELENA", "One.", ""),
        ScriptEntry::new("ELENA", "Two.", "whispering"),
        ScriptEntry::new("ELENA", "Three.", "shouting"),
    ];

    let units = SpeakerChunkGrouper::new(500).group(entries);

    assert_eq!(units.len(), 1);
    assert_eq!(units[0].style, "whispering");
}

#[test]
fn test_group_withOversizedEntry_shouldFollowPolicy() {
    let long = "This sentence is short. ".repeat(10).trim().to_string();
    let entries = vec![ScriptEntry::new("NARRATOR", long.clone(), "calm")];

    let passed = SpeakerChunkGrouper::new(60).group(entries.clone());
    let split = SpeakerChunkGrouper::new(60)
        .with_oversize_policy(OversizePolicy::Split)
        .group(entries);

    assert_eq!(passed.len(), 1);
    assert_eq!(passed[0].text, long);

    assert!(split.len() > 1);
    assert!(split.iter().all(|u| u.char_len() <= 60 && u.style == "calm"));
    let rejoined: Vec<String> = split.iter().map(|u| u.text.clone()).collect();
    assert_eq!(rejoined.join(" "), long);
}

#[test]
fn test_group_withEmptyInput_shouldReturnNothing() {
    assert!(SpeakerChunkGrouper::new(500).group(Vec::new()).is_empty());
}
