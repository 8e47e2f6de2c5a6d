//! Answer generator — the free-form collaborator behind the chat.
//!
//! Supports:
//! - **Anthropic**: Direct API access via rig-core
//! - **OpenAI**: Direct API access via rig-core
//!
//! The engine treats this as an opaque, fallible `prompt -> answer`
//! function with a bounded timeout. Failures are caught at the call site
//! and replaced with a fixed fallback reply.

pub mod prompt;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rig::agent::{Agent, AgentBuilder};
use rig::client::CompletionClient;
use rig::completion::{CompletionModel, Prompt};
use secrecy::ExposeSecret;

use crate::error::GenerationError;

/// Supported generator backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorBackend {
    Anthropic,
    OpenAi,
}

/// Configuration for creating an answer generator.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub backend: GeneratorBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
    /// Per-call timeout; a slow provider is a failed turn, never a hung one.
    pub timeout: Duration,
}

/// Opaque answer generator: prompt in, answer out, fallible.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

/// rig-core backed generator wrapping a preconfigured agent.
pub struct RigGenerator<M: CompletionModel> {
    agent: Agent<M>,
    provider: &'static str,
    model: String,
    timeout: Duration,
}

impl<M: CompletionModel> RigGenerator<M> {
    fn new(model: M, provider: &'static str, model_name: &str, timeout: Duration) -> Self {
        let agent = AgentBuilder::new(model)
            .preamble(prompt::NUTRITION_PREAMBLE)
            .build();
        Self {
            agent,
            provider,
            model: model_name.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl<M: CompletionModel> AnswerGenerator for RigGenerator<M> {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let call = self.agent.prompt(prompt.to_string());
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(answer)) => Ok(answer),
            Ok(Err(e)) => Err(GenerationError::RequestFailed {
                provider: self.provider.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(GenerationError::Timeout {
                provider: self.provider.to_string(),
                timeout: self.timeout,
            }),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Create an answer generator from configuration.
pub fn create_generator(
    config: &GeneratorConfig,
) -> Result<Arc<dyn AnswerGenerator>, GenerationError> {
    match config.backend {
        GeneratorBackend::Anthropic => create_anthropic_generator(config),
        GeneratorBackend::OpenAi => create_openai_generator(config),
    }
}

fn create_anthropic_generator(
    config: &GeneratorConfig,
) -> Result<Arc<dyn AnswerGenerator>, GenerationError> {
    use rig::providers::anthropic;

    let client: rig::client::Client<anthropic::client::AnthropicExt> =
        anthropic::Client::new(config.api_key.expose_secret()).map_err(|e| {
            GenerationError::RequestFailed {
                provider: "anthropic".to_string(),
                reason: format!("Failed to create Anthropic client: {}", e),
            }
        })?;

    let model = client.completion_model(&config.model);
    tracing::info!("Using Anthropic (model: {})", config.model);
    Ok(Arc::new(RigGenerator::new(
        model,
        "anthropic",
        &config.model,
        config.timeout,
    )))
}

fn create_openai_generator(
    config: &GeneratorConfig,
) -> Result<Arc<dyn AnswerGenerator>, GenerationError> {
    use rig::providers::openai;

    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        openai::Client::new(config.api_key.expose_secret()).map_err(|e| {
            GenerationError::RequestFailed {
                provider: "openai".to_string(),
                reason: format!("Failed to create OpenAI client: {}", e),
            }
        })?;

    let model = client.completion_model(&config.model);
    tracing::info!("Using OpenAI (model: {})", config.model);
    Ok(Arc::new(RigGenerator::new(
        model,
        "openai",
        &config.model,
        config.timeout,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_generator_missing_key_still_constructs() {
        // rig-core clients accept any string as API key at construction time.
        // The actual auth failure happens when making a request.
        let config = GeneratorConfig {
            backend: GeneratorBackend::Anthropic,
            api_key: secrecy::SecretString::from("test-key"),
            model: "claude-3-5-sonnet-latest".to_string(),
            timeout: Duration::from_secs(5),
        };
        let generator = create_generator(&config);
        assert!(generator.is_ok());
        assert_eq!(generator.unwrap().model_name(), "claude-3-5-sonnet-latest");
    }

    #[tokio::test]
    async fn test_create_openai_generator() {
        let config = GeneratorConfig {
            backend: GeneratorBackend::OpenAi,
            api_key: secrecy::SecretString::from("sk-test"),
            model: "gpt-4o".to_string(),
            timeout: Duration::from_secs(5),
        };
        let generator = create_generator(&config);
        assert!(generator.is_ok());
        assert_eq!(generator.unwrap().model_name(), "gpt-4o");
    }
}
