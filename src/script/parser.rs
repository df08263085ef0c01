/*!
 * Tolerant decoding of rewriting-service responses.
 *
 * The rewriter is asked for a JSON array of `{speaker, text, style}` records
 * but LLM output is unreliable. Decoding proceeds in stages:
 * 1. Strip a surrounding markdown code fence, if any
 * 2. Strict decode of the whole array
 * 3. Salvage: cut after the last complete record, close the array, decode again
 * 4. Freeform `SPEAKER: text` lines, when the response is not JSON at all
 *
 * JSON that is not an array of records (a bare object, a wrapper object)
 * yields nothing. Prose before an array is skipped.
 *
 * A response that defeats every stage yields no entries and a warning; it is
 * never fatal to the pipeline.
 */

use log::{debug, warn};
use serde_json::Value;

use super::entry::{retain_valid, ScriptEntry};

/// Which decoding stage produced the entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseRecovery {
    /// The response decoded as-is
    Strict,
    /// The response was truncated or malformed; a leading prefix of records was recovered
    Salvaged,
    /// The response was freeform `SPEAKER: text` lines
    Freeform,
    /// Nothing could be recovered
    Failed,
}

/// Entries decoded from one response plus how they were obtained.
#[derive(Debug, Clone)]
pub struct ParsedScript {
    /// Valid entries in response order
    pub entries: Vec<ScriptEntry>,

    /// Decoding stage that succeeded
    pub recovery: ParseRecovery,

    /// Records dropped because they lacked a speaker or text
    pub discarded: usize,
}

impl ParsedScript {
    fn new(records: Vec<ScriptEntry>, recovery: ParseRecovery) -> Self {
        let total = records.len();
        let entries = retain_valid(records);
        let discarded = total - entries.len();
        Self {
            entries,
            recovery,
            discarded,
        }
    }

    fn failed() -> Self {
        Self {
            entries: Vec::new(),
            recovery: ParseRecovery::Failed,
            discarded: 0,
        }
    }

    /// Whether the response needed repair or could not be read.
    pub fn was_malformed(&self) -> bool {
        matches!(self.recovery, ParseRecovery::Salvaged | ParseRecovery::Failed)
    }
}

/// Decoder for rewriting-service responses.
#[derive(Debug, Clone, Default)]
pub struct ScriptEntryParser;

impl ScriptEntryParser {
    /// Create a parser.
    pub fn new() -> Self {
        Self
    }

    /// Decode one response into script entries.
    pub fn parse(&self, response: &str) -> ParsedScript {
        let body = strip_code_fence(response);

        if body.starts_with('[') {
            return Self::parse_array(body);
        }

        // JSON that is not an array of records carries no script
        if body.starts_with('{') || serde_json::from_str::<Value>(body).is_ok() {
            warn!(
                "Response is JSON but not an array of records, no entries recovered. Response preview: {}",
                preview(body)
            );
            return ParsedScript::failed();
        }

        if let Some(start) = find_record_array(body) {
            debug!("Skipping {} bytes of text before the record array", start);
            return Self::parse_array(&body[start..]);
        }

        let records = parse_freeform_lines(body);
        if records.is_empty() {
            warn!(
                "Could not parse response as a script, no entries recovered. Response preview: {}",
                preview(body)
            );
            return ParsedScript::failed();
        }
        debug!("Parsed {} freeform script lines", records.len());
        ParsedScript::new(records, ParseRecovery::Freeform)
    }

    /// Strict decode, then salvage, of a body starting at its `[`.
    fn parse_array(body: &str) -> ParsedScript {
        match decode_records(body) {
            Some(records) => ParsedScript::new(records, ParseRecovery::Strict),
            None => match salvage(body) {
                Some(records) => {
                    warn!(
                        "Response was malformed, salvaged {} complete record(s)",
                        records.len()
                    );
                    ParsedScript::new(records, ParseRecovery::Salvaged)
                }
                None => {
                    warn!(
                        "Could not parse response as JSON, no entries recovered. Response preview: {}",
                        preview(body)
                    );
                    ParsedScript::failed()
                }
            },
        }
    }
}

/// Byte offset of the first `[` that opens an array of objects, e.g. after a prose preamble.
fn find_record_array(body: &str) -> Option<usize> {
    body.match_indices('[')
        .map(|(i, _)| i)
        .find(|&i| body[i + 1..].trim_start().starts_with('{'))
}

/// Remove a leading ```` ``` ```` line (with optional language tag) and a trailing one.
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    let body = match trimmed.find('\n') {
        Some(newline) => &trimmed[newline + 1..],
        None => return "",
    };

    let body = body.trim_end();
    match body.rfind('\n') {
        Some(newline) if body[newline + 1..].trim_start().starts_with("```") => body[..newline].trim(),
        None if body.starts_with("```") => "",
        _ => body.trim(),
    }
}

/// Strict decode of a JSON array of records.
fn decode_records(body: &str) -> Option<Vec<ScriptEntry>> {
    match serde_json::from_str::<Vec<Value>>(body) {
        Ok(values) => Some(values.iter().filter_map(record_from_value).collect()),
        Err(e) => {
            debug!("Strict decode failed: {}", e);
            None
        }
    }
}

/// Lenient field extraction: non-string fields count as absent.
fn record_from_value(value: &Value) -> Option<ScriptEntry> {
    let object = value.as_object()?;
    let field = |name: &str| object.get(name).and_then(Value::as_str).unwrap_or_default();
    Some(ScriptEntry::new(field("speaker"), field("text"), field("style")))
}

/// Recover the complete leading records of a truncated or malformed array.
fn salvage(body: &str) -> Option<Vec<ScriptEntry>> {
    let end = last_complete_record_end(body)?;
    let repaired = format!("{}]", &body[..end]);
    decode_records(&repaired)
}

/// Byte offset just past the last `}` that closes a top-level array element.
///
/// Scans with string and escape awareness so braces inside text do not count.
fn last_complete_record_end(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut last_end = None;

    for (i, c) in body.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                if c == '}' && depth == 1 {
                    last_end = Some(i + 1);
                }
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
    }

    last_end
}

/// Parse `SPEAKER: text` lines; lines without a colon are ignored.
pub fn parse_freeform_lines(body: &str) -> Vec<ScriptEntry> {
    body.lines()
        .filter_map(|line| {
            let (speaker, text) = line.trim().split_once(':')?;
            // Fragments of JSON are never speaker labels
            if speaker.contains(['{', '[', '"']) {
                return None;
            }
            let speaker = speaker.replace(['*', '#'], "");
            let entry = ScriptEntry::new(speaker, text, "");
            entry.is_valid().then_some(entry)
        })
        .collect()
}

fn preview(text: &str) -> String {
    let head: String = text.chars().take(200).collect();
    if text.chars().count() > 200 {
        format!("{}...", head)
    } else {
        head
    }
}
