/*!
 * Speaker-aware regrouping of script entries into synthesis units.
 *
 * Consecutive entries from the same speaker are merged (joined by one space)
 * while the merged text stays within a character budget, so the synthesis
 * service sees fewer, longer requests. A unit never spans two speakers.
 */

use log::debug;
use serde::{Deserialize, Serialize};

use super::entry::ScriptEntry;
use super::segmenter::split_sentences;

/// What to do with a single entry whose text alone exceeds the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OversizePolicy {
    /// Emit the entry unsplit as one oversized unit
    #[default]
    PassThrough,
    /// Hard-split at sentence, then word, then character boundaries
    Split,
}

/// A bounded run of same-speaker text sent as one synthesis request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioUnit {
    /// Zero-based ordinal in the unit sequence
    pub index: usize,

    /// Speaker label shared by every merged entry
    pub speaker: String,

    /// Merged text
    pub text: String,

    /// First non-empty style among the merged entries
    pub style: String,
}

impl AudioUnit {
    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Short single-line preview for progress output.
    pub fn preview(&self, max_chars: usize) -> String {
        let flat = self.text.replace('\n', " ");
        if flat.chars().count() > max_chars {
            format!("{}...", flat.chars().take(max_chars).collect::<String>())
        } else {
            flat
        }
    }
}

/// Merges consecutive same-speaker entries into budget-bounded units.
#[derive(Debug, Clone)]
pub struct SpeakerChunkGrouper {
    char_budget: usize,
    oversize_policy: OversizePolicy,
}

impl SpeakerChunkGrouper {
    /// Create a grouper with the given character budget and the default oversize policy.
    pub fn new(char_budget: usize) -> Self {
        Self {
            char_budget: char_budget.max(1),
            oversize_policy: OversizePolicy::default(),
        }
    }

    /// Set how oversized single entries are handled.
    pub fn with_oversize_policy(mut self, policy: OversizePolicy) -> Self {
        self.oversize_policy = policy;
        self
    }

    /// Configured budget.
    pub fn char_budget(&self) -> usize {
        self.char_budget
    }

    /// Group entries into units in a single linear pass, preserving order.
    pub fn group(&self, entries: Vec<ScriptEntry>) -> Vec<AudioUnit> {
        let mut units: Vec<AudioUnit> = Vec::new();
        let mut open: Option<OpenUnit> = None;

        for entry in entries {
            if !entry.is_valid() {
                continue;
            }

            if let Some(current) = open.as_mut() {
                if current.speaker == entry.speaker && current.try_merge(&entry, self.char_budget) {
                    continue;
                }
            }

            if let Some(closed) = open.take() {
                units.push(closed.finish());
            }
            open = Some(self.open_unit(entry, &mut units));
        }

        if let Some(closed) = open {
            units.push(closed.finish());
        }

        for (index, unit) in units.iter_mut().enumerate() {
            unit.index = index;
        }
        units
    }

    /// Start a unit from `entry`, emitting split pieces directly when the policy asks for it.
    fn open_unit(&self, entry: ScriptEntry, units: &mut Vec<AudioUnit>) -> OpenUnit {
        let len = entry.char_len();
        if len <= self.char_budget || self.oversize_policy == OversizePolicy::PassThrough {
            if len > self.char_budget {
                debug!(
                    "Entry for {} has {} chars, over budget {}, passing through unsplit",
                    entry.speaker, len, self.char_budget
                );
            }
            return OpenUnit::from_entry(entry);
        }

        let mut pieces = hard_split(&entry.text, self.char_budget);
        debug!(
            "Entry for {} has {} chars, split into {} pieces",
            entry.speaker,
            len,
            pieces.len()
        );
        // The last piece stays open so following same-speaker entries can still merge into it
        let last = pieces.pop().unwrap_or_default();
        for piece in pieces {
            units.push(AudioUnit {
                index: 0,
                speaker: entry.speaker.clone(),
                text: piece,
                style: entry.style.clone(),
            });
        }
        OpenUnit {
            len: last.chars().count(),
            speaker: entry.speaker,
            text: last,
            style: entry.style,
        }
    }
}

/// Unit under construction.
struct OpenUnit {
    speaker: String,
    text: String,
    style: String,
    len: usize,
}

impl OpenUnit {
    fn from_entry(entry: ScriptEntry) -> Self {
        Self {
            len: entry.char_len(),
            speaker: entry.speaker,
            text: entry.text,
            style: entry.style,
        }
    }

    /// Append `entry` if the joined text stays within budget.
    fn try_merge(&mut self, entry: &ScriptEntry, budget: usize) -> bool {
        let merged_len = self.len + 1 + entry.char_len();
        if merged_len > budget {
            return false;
        }
        self.text.push(' ');
        self.text.push_str(&entry.text);
        self.len = merged_len;
        if self.style.is_empty() {
            self.style = entry.style.clone();
        }
        true
    }

    fn finish(self) -> AudioUnit {
        AudioUnit {
            index: 0,
            speaker: self.speaker,
            text: self.text,
            style: self.style,
        }
    }
}

/// Split text into pieces of at most `budget` characters.
///
/// Prefers sentence boundaries, then word boundaries; a single word longer
/// than the budget is cut between characters.
pub fn hard_split(text: &str, budget: usize) -> Vec<String> {
    let budget = budget.max(1);
    let mut pieces: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    let mut push_atom = |atom: &str, pieces: &mut Vec<String>| {
        let atom_len = atom.chars().count();
        if current.is_empty() {
            current.push_str(atom);
            current_len = atom_len;
        } else if current_len + 1 + atom_len <= budget {
            current.push(' ');
            current.push_str(atom);
            current_len += 1 + atom_len;
        } else {
            pieces.push(std::mem::replace(&mut current, atom.to_string()));
            current_len = atom_len;
        }
    };

    for sentence in split_sentences(text) {
        if sentence.chars().count() <= budget {
            push_atom(sentence, &mut pieces);
            continue;
        }
        for word in sentence.split_whitespace() {
            if word.chars().count() <= budget {
                push_atom(word, &mut pieces);
                continue;
            }
            let chars: Vec<char> = word.chars().collect();
            for slice in chars.chunks(budget) {
                let part: String = slice.iter().collect();
                push_atom(&part, &mut pieces);
            }
        }
    }

    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}
