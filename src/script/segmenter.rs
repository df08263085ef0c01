/*!
 * Boundary-aware manuscript segmentation.
 *
 * The manuscript is cut into chunks small enough for one rewriting request.
 * Cuts happen at paragraph boundaries (blank lines) first; a paragraph that
 * alone exceeds the limit is cut at sentence boundaries instead. A single
 * sentence longer than the limit becomes one oversized chunk rather than
 * being truncated.
 *
 * Segmentation is lossless: the only characters that can change are the
 * whitespace runs at the chosen boundaries, which are normalised to a blank
 * line between paragraphs and a single space between sentences.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

/// Blank line: newline, optional horizontal whitespace, newline, then any further whitespace.
static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t\r\x0B\x0C]*\n\s*").expect("paragraph regex is valid"));

const PARAGRAPH_SEPARATOR: &str = "\n\n";
const SENTENCE_SEPARATOR: &str = " ";

/// Where a chunk sits in the manuscript, used as a context hint for the rewriter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkPosition {
    /// The manuscript fits in a single chunk
    Only,
    /// First of several chunks
    First,
    /// Neither first nor last
    Interior,
    /// Last of several chunks
    Last,
}

/// A bounded manuscript slice sent to the rewriting service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Zero-based ordinal
    pub index: usize,

    /// Number of chunks the manuscript was split into
    pub total: usize,

    /// Chunk text
    pub text: String,
}

impl Chunk {
    /// Position of this chunk within the manuscript.
    pub fn position(&self) -> ChunkPosition {
        match (self.index, self.total) {
            (_, 0 | 1) => ChunkPosition::Only,
            (0, _) => ChunkPosition::First,
            (i, n) if i + 1 == n => ChunkPosition::Last,
            _ => ChunkPosition::Interior,
        }
    }

    /// Length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Splits manuscripts into size-bounded, boundary-aligned chunks.
#[derive(Debug, Clone)]
pub struct TextSegmenter {
    max_chars: usize,
}

impl TextSegmenter {
    /// Create a segmenter emitting chunks of at most `max_chars` characters.
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    /// Configured chunk limit.
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Split a manuscript into ordered chunks.
    ///
    /// Empty or whitespace-only input yields no chunks.
    pub fn split(&self, manuscript: &str) -> Vec<Chunk> {
        let mut texts: Vec<String> = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for paragraph in split_paragraphs(manuscript) {
            let paragraph_len = paragraph.chars().count();

            if paragraph_len > self.max_chars {
                if !current.is_empty() {
                    texts.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let sentences = split_sentences(paragraph);
                debug!(
                    "Paragraph of {} chars exceeds limit {}, splitting {} sentences",
                    paragraph_len,
                    self.max_chars,
                    sentences.len()
                );
                texts.extend(pack(&sentences, SENTENCE_SEPARATOR, self.max_chars));
                continue;
            }

            if current.is_empty() {
                current.push_str(paragraph);
                current_len = paragraph_len;
            } else if current_len + PARAGRAPH_SEPARATOR.len() + paragraph_len <= self.max_chars {
                current.push_str(PARAGRAPH_SEPARATOR);
                current.push_str(paragraph);
                current_len += PARAGRAPH_SEPARATOR.len() + paragraph_len;
            } else {
                texts.push(std::mem::replace(&mut current, paragraph.to_string()));
                current_len = paragraph_len;
            }
        }

        if !current.is_empty() {
            texts.push(current);
        }

        let total = texts.len();
        texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk { index, total, text })
            .collect()
    }
}

/// Split text on blank lines, trimming each paragraph and skipping empty ones.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    PARAGRAPH_BREAK
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

/// Split a paragraph after end-of-sentence punctuation that is followed by whitespace.
///
/// Closing quotes and brackets directly after the punctuation stay with the sentence.
pub fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = paragraph.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?' | '…') {
            continue;
        }
        while let Some(&(_, next)) = chars.peek() {
            if matches!(next, '"' | '\'' | '”' | '’' | ')' | ']' | '»' | '.' | '!' | '?') {
                chars.next();
            } else {
                break;
            }
        }
        match chars.peek() {
            Some(&(end, next)) if next.is_whitespace() => {
                let sentence = paragraph[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = end;
            }
            _ => {}
        }
    }

    let tail = paragraph[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Greedily join pieces with `separator` while the result stays within `max_chars`.
///
/// A piece longer than `max_chars` is emitted on its own.
fn pack(pieces: &[&str], separator: &str, max_chars: usize) -> Vec<String> {
    let separator_len = separator.chars().count();
    let mut packed = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for piece in pieces {
        let piece_len = piece.chars().count();
        if current.is_empty() {
            current.push_str(piece);
            current_len = piece_len;
        } else if current_len + separator_len + piece_len <= max_chars {
            current.push_str(separator);
            current.push_str(piece);
            current_len += separator_len + piece_len;
        } else {
            packed.push(std::mem::replace(&mut current, piece.to_string()));
            current_len = piece_len;
        }
    }

    if !current.is_empty() {
        if current_len > max_chars {
            debug!("Emitting oversized sentence chunk of {} chars", current_len);
        }
        packed.push(current);
    }
    packed
}
