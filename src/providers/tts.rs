/*!
 * HTTP client for the speech synthesis service.
 *
 * Each unit is sent as one JSON POST. The service answers either with the
 * audio bytes themselves or with a JSON object naming the file it wrote
 * (`{"path": "..."}`). Either way the client hands back a path; checking
 * that the file is really there is left to the caller.
 */

use async_trait::async_trait;
use log::debug;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use super::{SynthesisRequest, Synthesizer};
use crate::errors::ProviderError;

/// Request body accepted by the synthesis endpoint
#[derive(Debug, Serialize)]
struct SynthesisBody<'a> {
    text: &'a str,
    speaker: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ref_audio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ref_text: Option<&'a str>,
    #[serde(skip_serializing_if = "str::is_empty")]
    style: &'a str,
    seed: i64,
}

/// JSON answer naming a file written by the service
#[derive(Debug, Deserialize)]
struct PathAnswer {
    #[serde(alias = "audio_path", alias = "file")]
    path: PathBuf,
}

/// Synthesizer talking to an HTTP endpoint
#[derive(Debug)]
pub struct HttpSynthesizer {
    /// Endpoint receiving synthesis requests
    endpoint: Url,
    /// HTTP client for making requests
    client: Client,
}

impl HttpSynthesizer {
    /// Create a client for `endpoint`; `timeout_secs` of `None` waits indefinitely
    pub fn new(endpoint: &str, timeout_secs: Option<u64>) -> Result<Self, ProviderError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid synthesis endpoint '{}': {}", endpoint, e)))?;

        let mut builder = Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder
            .build()
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to build synthesis client: {}", e)))?;

        Ok(Self { endpoint, client })
    }

    /// Endpoint in use
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest, work_dir: &Path) -> Result<PathBuf, ProviderError> {
        let body = SynthesisBody {
            text: &request.text,
            speaker: &request.speaker,
            voice_id: request.voice.voice_id.as_deref(),
            ref_audio: request
                .voice
                .ref_audio
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            ref_text: request.voice.ref_text.as_deref(),
            style: &request.style,
            seed: request.seed,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to reach synthesis service: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        let is_json = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("json"));

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to read synthesis response: {}", e)))?;

        if is_json {
            let answer: PathAnswer = serde_json::from_slice(&bytes)
                .map_err(|e| ProviderError::ParseError(format!("Unexpected synthesis response: {}", e)))?;
            debug!("Synthesis service wrote unit {} to {:?}", request.index, answer.path);
            return Ok(answer.path);
        }

        store_audio(&bytes, request.index, work_dir)
    }
}

/// Write returned audio bytes to a uniquely named file in `work_dir`.
fn store_audio(bytes: &[u8], index: usize, work_dir: &Path) -> Result<PathBuf, ProviderError> {
    if bytes.is_empty() {
        return Err(ProviderError::ParseError("Synthesis service returned no audio".to_string()));
    }

    let store_error = |e: std::io::Error| ProviderError::RequestFailed(format!("Failed to store synthesized audio: {}", e));

    std::fs::create_dir_all(work_dir).map_err(store_error)?;
    let mut file = tempfile::Builder::new()
        .prefix(&format!("unit_{:04}_", index))
        .suffix(".wav")
        .tempfile_in(work_dir)
        .map_err(store_error)?;
    file.write_all(bytes).map_err(store_error)?;
    let (_, path) = file.keep().map_err(|e| store_error(e.error))?;

    debug!("Stored {} bytes of audio for unit {} at {:?}", bytes.len(), index, path);
    Ok(path)
}
