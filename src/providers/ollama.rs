use log::{error, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ProviderError;

/// Ollama client for interacting with Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Generation options for the Ollama API
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation (default: 0.8)
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Generated text
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval_count: Option<u64>,
}

impl GenerationRequest {
    /// Create a new generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: None,
            stream: Some(false),
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).temperature = Some(temperature);
        self
    }

    /// Set the maximum number of generated tokens
    pub fn num_predict(mut self, num_predict: u32) -> Self {
        self.options.get_or_insert_with(GenerationOptions::default).num_predict = Some(num_predict);
        self
    }
}

impl Ollama {
    /// Create a new Ollama client from a complete URL
    ///
    /// # Arguments
    /// * `base_url` - e.g. `http://localhost:11434`
    /// * `timeout_secs` - request timeout; `None` waits indefinitely
    /// * `max_retries` - retries after the first attempt
    /// * `backoff_base_ms` - first backoff delay, doubled on each retry
    pub fn new_with_config(
        base_url: impl Into<String>,
        timeout_secs: Option<u64>,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Self {
        let mut builder = Client::builder()
            // Force HTTP/1.1 - Ollama uses HTTP/1.1
            .http1_only()
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60));
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: builder.build().unwrap_or_default(),
            max_retries,
            backoff_base_ms,
        }
    }

    /// Base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Generate text from the Ollama API with retry logic
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);

        let mut attempt = 0;
        let mut last_error = None;

        while attempt <= self.max_retries {
            match self.client.post(&url).json(&request).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let response_text = response.text().await.map_err(|e| {
                            ProviderError::ParseError(format!(
                                "Failed to get response text from Ollama API: {}",
                                e
                            ))
                        })?;
                        return parse_generation_response(&response_text);
                    }

                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to get error response text".to_string());
                    let api_error = ProviderError::ApiError {
                        status_code: status.as_u16(),
                        message: error_text,
                    };
                    if !status.is_server_error() {
                        // Client error - don't retry
                        error!("Ollama API error: {}", api_error);
                        return Err(api_error);
                    }
                    error!(
                        "Ollama API error: {} - attempt {}/{}",
                        api_error,
                        attempt + 1,
                        self.max_retries + 1
                    );
                    last_error = Some(api_error);
                }
                Err(e) => {
                    // Network error - can retry
                    error!(
                        "Ollama API network error: {} - attempt {}/{}",
                        e,
                        attempt + 1,
                        self.max_retries + 1
                    );
                    last_error = Some(ProviderError::ConnectionError(format!(
                        "Failed to send request to Ollama API: {}",
                        e
                    )));
                }
            }

            attempt += 1;

            // If we have more retries left, wait with exponential backoff
            if attempt <= self.max_retries {
                let backoff_ms = super::backoff_delay_ms(self.backoff_base_ms, attempt);
                warn!("Retrying Ollama request in {}ms", backoff_ms);
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            ProviderError::RequestFailed(format!(
                "Ollama API request failed after {} attempts",
                self.max_retries + 1
            ))
        }))
    }

    /// Get the Ollama API version
    pub async fn version(&self) -> Result<String, ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response: serde_json::Value = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to connect to Ollama: {}", e)))?
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Ollama version response: {}", e)))?;

        response["version"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::ParseError("Invalid version format in response".to_string()))
    }
}

/// Parse a generate response, accepting both a single object and a JSONL stream.
fn parse_generation_response(response_text: &str) -> Result<GenerationResponse, ProviderError> {
    if let Ok(generated) = serde_json::from_str::<GenerationResponse>(response_text) {
        return Ok(generated);
    }

    // The response might be in JSONL format (streaming response); concatenate the pieces
    let values: Vec<serde_json::Value> = response_text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();

    if values.is_empty() {
        error!(
            "Failed to parse Ollama API response. Raw response (first 500 chars): {}",
            response_text.chars().take(500).collect::<String>()
        );
        return Err(ProviderError::ParseError(
            "Ollama API response contains invalid JSON".to_string(),
        ));
    }

    let response: String = values
        .iter()
        .filter_map(|v| v.get("response").and_then(|r| r.as_str()))
        .collect();
    let last = &values[values.len() - 1];

    Ok(GenerationResponse {
        model: last
            .get("model")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string(),
        response,
        done: true,
        prompt_eval_count: last.get("prompt_eval_count").and_then(|v| v.as_u64()),
        eval_count: last.get("eval_count").and_then(|v| v.as_u64()),
    })
}
