/*!
 * Prompt templates for manuscript rewriting.
 *
 * The rewriter is instructed to return only a JSON array of
 * `{speaker, text, style}` records. Each chunk is sent with a short hint
 * telling the model where the chunk sits in the book.
 */

use super::segmenter::{Chunk, ChunkPosition};

/// System prompt template for script rewriting.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string
    template: String,
}

impl PromptTemplate {
    /// The default system prompt for turning prose into a voiced script.
    pub const SCRIPT_WRITER: &'static str = r#"Convert this book/novel text into an audioplay script as a JSON array.

OUTPUT FORMAT - Return ONLY a valid JSON array:
[
  {"speaker": "NARRATOR", "text": "Description text here.", "style": "tone direction"},
  {"speaker": "CHARACTER", "text": "Dialogue here.", "style": "emotional direction"}
]

FIELDS:
- "speaker": Character name in UPPERCASE (use "NARRATOR" for descriptions/scene-setting)
- "text": The spoken text, with bracketed non-verbal sounds where appropriate
- "style": Brief delivery direction (2-5 words like "warm, nostalgic" or "cold, threatening")

NON-VERBAL SOUNDS - Include where emotionally appropriate:
[sighs], [laughs], [chuckles], [giggles], [scoffs], [gasps], [groans], [moans],
[whimpers], [sobs], [cries], [sniffs], [whispers], [shouts], [screams],
[clears throat], [coughs], [pauses], [hesitates], [stammers], [gulps]

Can be inline: "[sighs] I suppose you're right."
Or standalone: {"speaker": "ELENA", "text": "[sobs]", "style": "heartbroken"}

RULES:
1. NARRATOR handles all descriptive text, scene-setting, actions, inner thoughts
2. Character dialogue attributed to named characters (extract from context)
3. Use style directions to convey emotional tone
4. Break long passages into pieces under 400 characters each
5. Output ONLY valid JSON - no markdown, no code blocks, no explanations
6. Preserve the emotional arc of the story
7. Keep every sentence of the source text; do not summarize

EXAMPLE:
[
  {"speaker": "NARRATOR", "text": "The old mansion loomed against the stormy sky.", "style": "ominous, foreboding"},
  {"speaker": "ELENA", "text": "[shivers] I don't like this place.", "style": "nervous, quiet"},
  {"speaker": "MARCUS", "text": "[chuckles] Scared of a little dust?", "style": "teasing, confident"},
  {"speaker": "NARRATOR", "text": "A floorboard creaked somewhere above them.", "style": "tense, suspenseful"},
  {"speaker": "ELENA", "text": "[gasps]", "style": "startled"}
]"#;

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the default script writer template.
    pub fn script_writer() -> Self {
        Self::new(Self::SCRIPT_WRITER)
    }

    /// Template text.
    pub fn render(&self) -> &str {
        &self.template
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::script_writer()
    }
}

/// Builds the system and user prompts for one chunk.
#[derive(Debug, Clone)]
pub struct ScriptPromptBuilder {
    template: PromptTemplate,
}

impl ScriptPromptBuilder {
    /// Builder using the default template.
    pub fn new() -> Self {
        Self {
            template: PromptTemplate::default(),
        }
    }

    /// Replace the system prompt; blank overrides are ignored.
    pub fn with_system_prompt(mut self, system_prompt: &str) -> Self {
        if !system_prompt.trim().is_empty() {
            self.template = PromptTemplate::new(system_prompt);
        }
        self
    }

    /// The system prompt.
    pub fn build_system_prompt(&self) -> String {
        self.template.render().to_string()
    }

    /// The user prompt carrying the chunk text and its position hint.
    pub fn build_user_prompt(&self, chunk: &Chunk) -> String {
        format!(
            "{}\n\nTEXT TO CONVERT:\n{}",
            position_hint(chunk),
            chunk.text
        )
    }

    /// Both prompts for a chunk.
    pub fn build(&self, chunk: &Chunk) -> (String, String) {
        (self.build_system_prompt(), self.build_user_prompt(chunk))
    }
}

impl Default for ScriptPromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// One-line description of where a chunk sits in the book.
pub fn position_hint(chunk: &Chunk) -> String {
    let ordinal = chunk.index + 1;
    match chunk.position() {
        ChunkPosition::Only => "This is the complete text.".to_string(),
        ChunkPosition::First => format!(
            "This is part {} of {} (the opening of the book).",
            ordinal, chunk.total
        ),
        ChunkPosition::Interior => format!(
            "This is part {} of {} (continuing from the previous part).",
            ordinal, chunk.total
        ),
        ChunkPosition::Last => format!(
            "This is part {} of {} (the final part of the book).",
            ordinal, chunk.total
        ),
    }
}
