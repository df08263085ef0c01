use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};

use crate::script::OversizePolicy;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Rewriting (scriptification) service config
    #[serde(default)]
    pub rewriter: RewriterConfig,

    /// Speech synthesis service config
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Segmentation, grouping and assembly parameters
    #[serde(default)]
    pub pipeline: PipelineSettings,

    /// Directory receiving the script, segments and the final track
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Rewriting provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RewriterProvider {
    // @provider: Ollama
    #[default]
    Ollama,
    // @provider: Anthropic
    Anthropic,
}

impl RewriterProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::Anthropic => "Anthropic",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::Anthropic => "anthropic".to_string(),
        }
    }
}

impl std::fmt::Display for RewriterProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for RewriterProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds, none means wait indefinitely
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    // @field: Max tokens the model may generate per chunk
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: RewriterProvider) -> Self {
        match provider_type {
            RewriterProvider::Ollama => Self {
                provider_type: "ollama".to_string(),
                model: default_ollama_model(),
                api_key: String::new(),
                endpoint: default_ollama_endpoint(),
                timeout_secs: None,
                max_tokens: default_max_tokens(),
            },
            RewriterProvider::Anthropic => Self {
                provider_type: "anthropic".to_string(),
                model: default_anthropic_model(),
                api_key: String::new(),
                endpoint: default_anthropic_endpoint(),
                timeout_secs: None,
                max_tokens: default_max_tokens(),
            },
        }
    }
}

/// Rewriting service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RewriterConfig {
    /// Rewriting provider to use
    #[serde(default)]
    pub provider: RewriterProvider,

    /// Available rewriting providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common rewriting settings
    #[serde(default)]
    pub common: RewriterCommonConfig,
}

/// Common rewriting settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RewriterCommonConfig {
    /// System prompt override; empty uses the built-in audioplay prompt
    #[serde(default)]
    pub system_prompt: String,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff multiplier for retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for RewriterCommonConfig {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
        }
    }
}

/// Speech synthesis service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SynthesisConfig {
    /// HTTP endpoint accepting synthesis requests
    #[serde(default = "default_synthesis_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds; none means wait indefinitely
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Units synthesised in parallel; 1 keeps the run strictly sequential
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Synthesise a short test phrase before the first unit
    #[serde(default = "default_true")]
    pub test_connection: bool,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            endpoint: default_synthesis_endpoint(),
            timeout_secs: None,
            concurrent_requests: default_concurrent_requests(),
            test_connection: true,
        }
    }
}

/// Segmentation, grouping and assembly parameters
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PipelineSettings {
    /// Maximum characters per manuscript chunk sent to the rewriter
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Maximum characters per synthesis unit
    #[serde(default = "default_unit_char_budget")]
    pub unit_char_budget: usize,

    /// Silence between segments of different speakers
    #[serde(default = "default_cross_speaker_pause_ms")]
    pub cross_speaker_pause_ms: u64,

    /// Silence between consecutive segments of the same speaker
    #[serde(default = "default_same_speaker_pause_ms")]
    pub same_speaker_pause_ms: u64,

    /// Handling of single entries longer than the unit budget
    #[serde(default)]
    pub oversize_policy: OversizePolicy,

    /// Keep one audio file per successful unit
    #[serde(default = "default_true")]
    pub persist_segments: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
            unit_char_budget: default_unit_char_budget(),
            cross_speaker_pause_ms: default_cross_speaker_pause_ms(),
            same_speaker_pause_ms: default_same_speaker_pause_ms(),
            oversize_policy: OversizePolicy::default(),
            persist_segments: true,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` filter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_concurrent_requests() -> usize {
    1
}

fn default_max_tokens() -> u32 {
    8192
}

fn default_max_chunk_chars() -> usize {
    4096
}

fn default_unit_char_budget() -> usize {
    500
}

fn default_cross_speaker_pause_ms() -> u64 {
    500
}

fn default_same_speaker_pause_ms() -> u64 {
    250
}

fn default_retry_count() -> u32 {
    0
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_temperature() -> f32 {
    0.7
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output_audio")
}

fn default_synthesis_endpoint() -> String {
    "http://127.0.0.1:7860/synthesize".to_string()
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

impl Config {
    /// Load configuration from `path`, writing a default file first if none exists.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        log::warn!(
            "Config file not found at '{}', creating default config.",
            path.display()
        );
        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {}", path.display()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.max_chunk_chars == 0 {
            return Err(anyhow!("pipeline.max_chunk_chars must be greater than 0"));
        }
        if self.pipeline.unit_char_budget == 0 {
            return Err(anyhow!("pipeline.unit_char_budget must be greater than 0"));
        }
        if self.synthesis.endpoint.trim().is_empty() {
            return Err(anyhow!("synthesis.endpoint is required"));
        }
        if self.synthesis.concurrent_requests == 0 {
            return Err(anyhow!("synthesis.concurrent_requests must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.rewriter.common.temperature) {
            return Err(anyhow!(
                "rewriter.common.temperature must be between 0.0 and 2.0, got {}",
                self.rewriter.common.temperature
            ));
        }

        // Validate API key for all providers except Ollama
        if self.rewriter.provider == RewriterProvider::Anthropic && self.rewriter.get_api_key().is_empty() {
            return Err(anyhow!("Rewriter API key is required for Anthropic provider"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            rewriter: RewriterConfig::default(),
            synthesis: SynthesisConfig::default(),
            pipeline: PipelineSettings::default(),
            output_dir: default_output_dir(),
            log_level: LogLevel::default(),
        }
    }
}

impl RewriterConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        let provider_str = self.provider.to_lowercase_string();
        self.available_providers
            .iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Mutable access to the active provider configuration, inserting defaults if absent
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        let position = match self
            .available_providers
            .iter()
            .position(|p| p.provider_type == provider_str)
        {
            Some(position) => position,
            None => {
                self.available_providers
                    .push(ProviderConfig::new(self.provider.clone()));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[position]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        match self.provider {
            RewriterProvider::Ollama => default_ollama_model(),
            RewriterProvider::Anthropic => default_anthropic_model(),
        }
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.api_key.is_empty() {
                return provider_config.api_key.clone();
            }
        }

        // Ollama doesn't use API keys
        String::new()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        match self.provider {
            RewriterProvider::Ollama => default_ollama_endpoint(),
            RewriterProvider::Anthropic => default_anthropic_endpoint(),
        }
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> Option<u64> {
        self.get_active_provider_config()
            .and_then(|p| p.timeout_secs)
    }

    /// Get the generation token limit for the active provider
    pub fn get_max_tokens(&self) -> u32 {
        self.get_active_provider_config()
            .map(|p| p.max_tokens)
            .unwrap_or_else(default_max_tokens)
    }
}

impl Default for RewriterConfig {
    fn default() -> Self {
        Self {
            provider: RewriterProvider::default(),
            available_providers: vec![
                ProviderConfig::new(RewriterProvider::Ollama),
                ProviderConfig::new(RewriterProvider::Anthropic),
            ],
            common: RewriterCommonConfig::default(),
        }
    }
}
