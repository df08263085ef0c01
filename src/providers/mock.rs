/*!
 * Mock collaborators for testing.
 *
 * This module provides stand-ins for both pipeline seams:
 * - `MockScriptWriter::working()` - Answers every chunk with a well-formed script
 * - `MockScriptWriter::malformed()` - Answers with a fenced, truncated array
 * - `MockScriptWriter::failing()` - Always fails with an error
 * - `MockSynthesizer::working()` - Writes a short tone per unit into the work directory
 * - `MockSynthesizer::missing_output()` - Reports success but never writes the file
 */

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::audio::{AudioFormat, RenderedSegment};
use crate::errors::ProviderError;
use crate::providers::{ScriptWriter, SynthesisRequest, Synthesizer};
use crate::script::Chunk;

/// Amplitude of the tone written by the working synthesizer
pub const MOCK_TONE_LEVEL: f32 = 0.25;

/// Behavior mode for the mock script writer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScriptBehavior {
    /// Always succeeds with a well-formed JSON array
    Working,
    /// Wraps the array in a code fence and cuts it off mid-record
    Malformed,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns an empty response
    Empty,
    /// Simulates a slow response
    Slow { delay_ms: u64 },
}

/// Mock script writer for testing rewriting behavior
#[derive(Debug)]
pub struct MockScriptWriter {
    /// Behavior mode
    behavior: ScriptBehavior,
    /// Request counter for intermittent failures
    request_count: Arc<AtomicUsize>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&Chunk) -> String>,
}

impl MockScriptWriter {
    /// Create a new mock script writer with the specified behavior
    pub fn new(behavior: ScriptBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
        }
    }

    /// Create a working mock that always succeeds
    pub fn working() -> Self {
        Self::new(ScriptBehavior::Working)
    }

    /// Create a mock returning fenced, truncated responses
    pub fn malformed() -> Self {
        Self::new(ScriptBehavior::Malformed)
    }

    /// Create an intermittently failing mock
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(ScriptBehavior::Intermittent { fail_every })
    }

    /// Create a failing mock that always errors
    pub fn failing() -> Self {
        Self::new(ScriptBehavior::Failing)
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(ScriptBehavior::Empty)
    }

    /// Set a custom response generator used by the working behavior
    pub fn with_custom_response(mut self, generator: fn(&Chunk) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of requests received so far, shared between clones
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Narrate every paragraph of the chunk as one NARRATOR entry
    pub fn generate_script_response(chunk: &Chunk) -> String {
        let entries: Vec<serde_json::Value> = chunk
            .text
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| serde_json::json!({"speaker": "NARRATOR", "text": p, "style": ""}))
            .collect();
        serde_json::Value::Array(entries).to_string()
    }

    /// A fenced response whose last record is cut off
    pub fn generate_truncated_response(chunk: &Chunk) -> String {
        let complete = serde_json::json!({"speaker": "NARRATOR", "text": chunk.text.trim()});
        format!(
            "```json\n[{}, {{\"speaker\": \"NARRATOR\", \"text\": \"and then",
            complete
        )
    }

    fn script_for(&self, chunk: &Chunk) -> String {
        match self.custom_response {
            Some(generator) => generator(chunk),
            None => Self::generate_script_response(chunk),
        }
    }
}

impl Clone for MockScriptWriter {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl ScriptWriter for MockScriptWriter {
    async fn write_script(&self, chunk: &Chunk) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);

        match self.behavior {
            ScriptBehavior::Working => Ok(self.script_for(chunk)),

            ScriptBehavior::Malformed => Ok(Self::generate_truncated_response(chunk)),

            ScriptBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.script_for(chunk))
                }
            }

            ScriptBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            ScriptBehavior::Empty => Ok(String::new()),

            ScriptBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                Ok(self.script_for(chunk))
            }
        }
    }

    fn name(&self) -> String {
        "Mock".to_string()
    }
}

/// Behavior mode for the mock synthesizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SynthesisBehavior {
    /// Writes a tone for every request
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Reports a path that was never written
    MissingOutput,
    /// Writes a file that is not valid audio
    Unreadable,
    /// Simulates slow synthesis
    Slow { delay_ms: u64 },
}

/// Mock synthesizer writing real WAV files
#[derive(Debug)]
pub struct MockSynthesizer {
    /// Behavior mode
    behavior: SynthesisBehavior,
    /// Request counter for intermittent failures
    request_count: Arc<AtomicUsize>,
    /// Every request received, in arrival order
    requests: Arc<Mutex<Vec<SynthesisRequest>>>,
    /// Layout of the written files
    format: AudioFormat,
    /// Length of each written tone
    duration_ms: fn(&SynthesisRequest) -> u64,
    /// Requests matching this predicate fail regardless of behavior
    fail_when: Option<fn(&SynthesisRequest) -> bool>,
}

fn default_duration(_: &SynthesisRequest) -> u64 {
    100
}

impl MockSynthesizer {
    /// Create a new mock synthesizer with the specified behavior
    pub fn new(behavior: SynthesisBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            format: AudioFormat::new(16000, 1),
            duration_ms: default_duration,
            fail_when: None,
        }
    }

    /// Create a working mock synthesizer
    pub fn working() -> Self {
        Self::new(SynthesisBehavior::Working)
    }

    /// Create an intermittently failing mock
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(SynthesisBehavior::Intermittent { fail_every })
    }

    /// Create a failing mock that always errors
    pub fn failing() -> Self {
        Self::new(SynthesisBehavior::Failing)
    }

    /// Create a mock that never writes its output
    pub fn missing_output() -> Self {
        Self::new(SynthesisBehavior::MissingOutput)
    }

    /// Create a mock that writes undecodable files
    pub fn unreadable() -> Self {
        Self::new(SynthesisBehavior::Unreadable)
    }

    /// Set the layout of the written files
    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    /// Set how long each written tone lasts
    pub fn with_duration(mut self, duration_ms: fn(&SynthesisRequest) -> u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Fail every request matching `predicate`
    pub fn with_failure_when(mut self, predicate: fn(&SynthesisRequest) -> bool) -> Self {
        self.fail_when = Some(predicate);
        self
    }

    /// Number of requests received so far, shared between clones
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Snapshot of every request received
    pub fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn output_path(request: &SynthesisRequest, work_dir: &Path) -> PathBuf {
        work_dir.join(format!("mock_{:04}.wav", request.index))
    }

    fn write_tone(&self, request: &SynthesisRequest, work_dir: &Path) -> Result<PathBuf, ProviderError> {
        let path = Self::output_path(request, work_dir);
        let frames = self.format.frames_for_ms((self.duration_ms)(request));
        let samples = vec![MOCK_TONE_LEVEL; frames * self.format.channels as usize];

        std::fs::create_dir_all(work_dir).map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        RenderedSegment::new(request.index, &request.speaker, samples, self.format)
            .write_wav(&path)
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
        Ok(path)
    }
}

impl Clone for MockSynthesizer {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            requests: Arc::clone(&self.requests),
            format: self.format,
            duration_ms: self.duration_ms,
            fail_when: self.fail_when,
        }
    }
}

#[async_trait]
impl Synthesizer for MockSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest, work_dir: &Path) -> Result<PathBuf, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        if self.fail_when.is_some_and(|predicate| predicate(request)) {
            return Err(ProviderError::ApiError {
                message: format!("Simulated failure for {}", request.speaker),
                status_code: 500,
            });
        }

        match self.behavior {
            SynthesisBehavior::Working => self.write_tone(request, work_dir),

            SynthesisBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    self.write_tone(request, work_dir)
                }
            }

            SynthesisBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated synthesis failure".to_string(),
                status_code: 500,
            }),

            SynthesisBehavior::MissingOutput => Ok(Self::output_path(request, work_dir)),

            SynthesisBehavior::Unreadable => {
                let path = Self::output_path(request, work_dir);
                std::fs::write(&path, b"not audio").map_err(|e| ProviderError::RequestFailed(e.to_string()))?;
                Ok(path)
            }

            SynthesisBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                self.write_tone(request, work_dir)
            }
        }
    }
}
