/*!
 * Rewriting service backed by a configured LLM provider.
 *
 * `ScriptService` owns one provider client and the prompt builder, and
 * implements [`ScriptWriter`] so the orchestrator never sees which
 * provider is in use.
 */

use async_trait::async_trait;
use log::{debug, warn};
use std::time::Instant;

use super::anthropic::{Anthropic, AnthropicRequest};
use super::ollama::{GenerationRequest, Ollama};
use super::ScriptWriter;
use crate::app_config::{RewriterConfig, RewriterProvider};
use crate::errors::ProviderError;
use crate::script::{Chunk, ScriptPromptBuilder};

/// Rewriting provider implementation variants
#[derive(Debug)]
enum RewriterImpl {
    /// Ollama LLM service
    Ollama {
        /// Client instance
        client: Ollama,
    },

    /// Anthropic API service
    Anthropic {
        /// Client instance
        client: Anthropic,
    },
}

/// Main rewriting service turning manuscript chunks into script responses
#[derive(Debug)]
pub struct ScriptService {
    /// Provider implementation
    provider: RewriterImpl,

    /// Configuration for the rewriting service
    config: RewriterConfig,

    /// Prompt builder
    prompts: ScriptPromptBuilder,
}

impl ScriptService {
    /// Create a new rewriting service with the given configuration
    pub fn new(config: RewriterConfig) -> Self {
        let retry_count = config.common.retry_count;
        let retry_backoff_ms = config.common.retry_backoff_ms;
        let timeout_secs = config.get_timeout_secs();

        let provider = match config.provider {
            RewriterProvider::Ollama => RewriterImpl::Ollama {
                client: Ollama::new_with_config(
                    config.get_endpoint(),
                    timeout_secs,
                    retry_count,
                    retry_backoff_ms,
                ),
            },
            RewriterProvider::Anthropic => RewriterImpl::Anthropic {
                client: Anthropic::new_with_config(
                    config.get_api_key(),
                    config.get_endpoint(),
                    timeout_secs,
                    retry_count,
                    retry_backoff_ms,
                ),
            },
        };

        let prompts = ScriptPromptBuilder::new().with_system_prompt(&config.common.system_prompt);

        Self {
            provider,
            config,
            prompts,
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &RewriterConfig {
        &self.config
    }
}

#[async_trait]
impl ScriptWriter for ScriptService {
    async fn write_script(&self, chunk: &Chunk) -> Result<String, ProviderError> {
        let (system_prompt, user_prompt) = self.prompts.build(chunk);
        let model = self.config.get_model();
        let start_time = Instant::now();

        let text = match &self.provider {
            RewriterImpl::Ollama { client } => {
                let request = GenerationRequest::new(&model, user_prompt)
                    .system(system_prompt)
                    .temperature(self.config.common.temperature)
                    .num_predict(self.config.get_max_tokens());
                client.generate(request).await?.response
            }
            RewriterImpl::Anthropic { client } => {
                let request = AnthropicRequest::new(&model, self.config.get_max_tokens())
                    .system(system_prompt)
                    .temperature(self.config.common.temperature)
                    .add_message("user", user_prompt);
                let response = client.complete(request).await?;
                if response.stop_reason.as_deref() == Some("max_tokens") {
                    warn!(
                        "Response for chunk {}/{} hit the token limit and is likely truncated",
                        chunk.index + 1,
                        chunk.total
                    );
                }
                Anthropic::extract_text_from_response(&response)
            }
        };

        debug!(
            "{} response for chunk {}/{} received in {:?} ({} chars)",
            self.config.provider.display_name(),
            chunk.index + 1,
            chunk.total,
            start_time.elapsed(),
            text.chars().count()
        );
        Ok(text)
    }

    fn name(&self) -> String {
        format!("{} ({})", self.config.provider.display_name(), self.config.get_model())
    }
}
