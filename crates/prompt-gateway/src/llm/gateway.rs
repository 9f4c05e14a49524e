use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use super::errors::GatewayError;
use super::keys::ApiKey;
use super::prompts::GenerationConfig;

pub type InvocationFuture<'a> =
    Pin<Box<dyn Future<Output = Result<RawProviderResponse, GatewayError>> + Send + 'a>>;

/// Fully rendered provider request. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRequest {
    system_prompt: String,
    user_content: String,
    generation: GenerationConfig,
}

impl PromptRequest {
    pub fn new(
        system_prompt: impl Into<String>,
        user_content: impl Into<String>,
        generation: GenerationConfig,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_content: user_content.into(),
            generation,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn user_content(&self) -> &str {
        &self.user_content
    }

    pub fn generation(&self) -> GenerationConfig {
        self.generation
    }

    pub fn temperature(&self) -> f64 {
        self.generation.temperature()
    }

    pub fn max_output_tokens(&self) -> u32 {
        self.generation.max_output_tokens()
    }

    /// Single text part sent to the provider: system segment, blank line, user segment.
    pub fn flattened_prompt(&self) -> String {
        format!("{}\n\n{}", self.system_prompt, self.user_content)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub candidates_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawProviderResponse {
    pub status: u16,
    pub text: String,
    pub model_version: Option<String>,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

impl RawProviderResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            status: 200,
            text: text.into(),
            model_version: None,
            finish_reason: None,
            usage: None,
        }
    }
}

/// One outbound provider exchange. Implementations never retry.
pub trait CompletionClient: Send + Sync {
    fn invoke<'a>(&'a self, request: &'a PromptRequest, key: &'a ApiKey) -> InvocationFuture<'a>;
}
