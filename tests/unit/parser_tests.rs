/*!
 * Tests for tolerant decoding of rewriter responses
 */

use alexandria::script::{ParseRecovery, ScriptEntry, ScriptEntryParser};

fn sample_entries() -> Vec<ScriptEntry> {
    vec![
        ScriptEntry::new("NARRATOR", "The hall was silent {for once}.", "hushed"),
        ScriptEntry::new("ELENA", "He said \"stop\", and then: nothing.", ""),
        ScriptEntry::new("CAPTAIN", "Back-slashes \\ and brackets ] [ are fine.", "gruff"),
        ScriptEntry::new("ELENA", "Élan, naïveté, façade.", ""),
    ]
}

/// Serialize records one by one, remembering the byte offset where each record ends
fn serialize_with_record_ends(entries: &[ScriptEntry]) -> (String, Vec<usize>) {
    let mut body = String::from("[");
    let mut ends = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            body.push(',');
        }
        body.push_str(&serde_json::to_string(entry).unwrap());
        ends.push(body.len());
    }
    body.push(']');
    (body, ends)
}

/// Every truncation recovers exactly the records that were complete before the cut
#[test]
fn test_parse_withEveryTruncation_shouldRecoverCompleteLeadingRecords() {
    let entries = sample_entries();
    let (body, ends) = serialize_with_record_ends(&entries);
    let parser = ScriptEntryParser::new();

    for cut in 1..body.len() {
        if !body.is_char_boundary(cut) {
            continue;
        }
        let expected = ends.iter().filter(|&&end| end <= cut).count();

        let parsed = parser.parse(&body[..cut]);

        assert_eq!(parsed.entries, entries[..expected], "cut at {}: {}", cut, &body[..cut]);
        assert!(parsed.was_malformed());
    }

    let complete = parser.parse(&body);
    assert_eq!(complete.recovery, ParseRecovery::Strict);
    assert_eq!(complete.entries, entries);
}

#[test]
fn test_parse_withFencedTruncatedPrettyJson_shouldSalvage() {
    let pretty = serde_json::to_string_pretty(&sample_entries()).unwrap();
    let cut = pretty.rfind("\"CAPTAIN\"").unwrap();
    let response = format!("```json\n{}", &pretty[..cut]);

    let parsed = ScriptEntryParser::new().parse(&response);

    assert_eq!(parsed.recovery, ParseRecovery::Salvaged);
    assert_eq!(parsed.entries, sample_entries()[..2]);
}

#[test]
fn test_parse_withBlankFields_shouldDiscardEntries() {
    let response = r#"[
        {"speaker": "  ", "text": "orphan line"},
        {"speaker": "BOB", "text": "   "},
        {"speaker": "BOB", "text": "kept"}
    ]"#;

    let parsed = ScriptEntryParser::new().parse(response);

    assert_eq!(parsed.entries, vec![ScriptEntry::new("BOB", "kept", "")]);
    assert_eq!(parsed.discarded, 2);
}

#[test]
fn test_parse_withEmptyResponse_shouldFailQuietly() {
    let parsed = ScriptEntryParser::new().parse("");

    assert_eq!(parsed.recovery, ParseRecovery::Failed);
    assert!(parsed.entries.is_empty());
}
