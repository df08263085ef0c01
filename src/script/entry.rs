/*!
 * Utterance records produced by the rewriting service.
 */

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One attributed utterance: who says it, what they say, and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptEntry {
    /// Speaker label, e.g. `NARRATOR` or a character name
    pub speaker: String,

    /// Spoken text
    pub text: String,

    /// Delivery direction ("warm, nostalgic"); empty when the rewriter gave none
    #[serde(default)]
    pub style: String,
}

impl ScriptEntry {
    /// Create an entry, trimming all fields.
    pub fn new(speaker: impl Into<String>, text: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into().trim().to_string(),
            text: text.into().trim().to_string(),
            style: style.into().trim().to_string(),
        }
    }

    /// Entries need both a speaker and some text to be voiced.
    pub fn is_valid(&self) -> bool {
        !self.speaker.trim().is_empty() && !self.text.trim().is_empty()
    }

    /// Character count of the text, as used for all size budgets.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Drop entries that fail [`ScriptEntry::is_valid`], preserving order.
pub fn retain_valid(entries: Vec<ScriptEntry>) -> Vec<ScriptEntry> {
    entries.into_iter().filter(ScriptEntry::is_valid).collect()
}

/// Count entries per speaker, sorted by speaker label.
pub fn speaker_census(entries: &[ScriptEntry]) -> BTreeMap<String, usize> {
    let mut census = BTreeMap::new();
    for entry in entries {
        *census.entry(entry.speaker.clone()).or_insert(0) += 1;
    }
    census
}
