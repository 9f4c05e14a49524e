use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::errors::{GatewayError, TransportFailure};
use super::gateway::{
    CompletionClient, InvocationFuture, PromptRequest, RawProviderResponse, TokenUsage,
};
use super::keys::ApiKey;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone)]
pub struct GeminiClientConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for GeminiClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
        }
    }
}

#[derive(Debug, Error)]
pub enum GeminiClientError {
    #[error("failed to build Gemini http client: {0}")]
    HttpClient(String),
}

#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(config: GeminiClientConfig) -> Result<Self, GeminiClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|err| GeminiClientError::HttpClient(err.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model.trim()
            ),
            timeout: config.timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send_once(
        &self,
        request: &PromptRequest,
        key: &ApiKey,
    ) -> Result<RawProviderResponse, GatewayError> {
        let prompt = request.flattened_prompt();
        let body = GenerateContentRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: &prompt }],
            }],
            generation_config: RequestGenerationConfig {
                temperature: request.temperature(),
                max_output_tokens: request.max_output_tokens(),
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", key.expose())])
            .json(&body)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) if !status.is_success() => {
                debug!(
                    status = status.as_u16(),
                    error = %err.without_url(),
                    "provider error body unreadable"
                );
                String::new()
            }
            Err(err) => {
                let failure = if err.is_timeout() {
                    TransportFailure::Timeout
                } else {
                    TransportFailure::Body
                };
                return Err(GatewayError::transport(
                    failure,
                    err.without_url().to_string(),
                ));
            }
        };

        if !status.is_success() {
            return Err(GatewayError::Provider {
                status: status.as_u16(),
                message: provider_error_message(status, &body),
            });
        }

        let envelope: GenerateContentResponse = serde_json::from_str(&body).map_err(|err| {
            GatewayError::transport(
                TransportFailure::Body,
                format!("provider envelope is not valid json: {err}"),
            )
        })?;
        debug!(
            status = status.as_u16(),
            candidates = envelope.candidates.len(),
            "provider responded"
        );

        Ok(envelope.into_raw(status.as_u16()))
    }
}

impl CompletionClient for GeminiClient {
    fn invoke<'a>(&'a self, request: &'a PromptRequest, key: &'a ApiKey) -> InvocationFuture<'a> {
        Box::pin(async move {
            match tokio::time::timeout(self.timeout, self.send_once(request, key)).await {
                Ok(result) => result,
                Err(_) => Err(GatewayError::transport(
                    TransportFailure::Timeout,
                    format!("no provider response within {} ms", self.timeout.as_millis()),
                )),
            }
        })
    }
}

/// The request URL carries the key in its query string, so it is stripped
/// before the error text is kept anywhere.
fn classify_send_error(err: reqwest::Error) -> GatewayError {
    let failure = if err.is_timeout() {
        TransportFailure::Timeout
    } else if err.is_body() || err.is_decode() {
        TransportFailure::Body
    } else {
        TransportFailure::Connect
    };
    GatewayError::transport(failure, err.without_url().to_string())
}

fn provider_error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ProviderErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|error| error.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("provider request failed")
                .to_string()
        })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: [RequestContent<'a>; 1],
    generation_config: RequestGenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestGenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
    model_version: Option<String>,
    usage_metadata: Option<ResponseUsage>,
}

impl GenerateContentResponse {
    fn into_raw(self, status: u16) -> RawProviderResponse {
        let first = self.candidates.into_iter().next();
        let finish_reason = first
            .as_ref()
            .and_then(|candidate| candidate.finish_reason.clone());
        let text = first
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .unwrap_or_default();

        RawProviderResponse {
            status,
            text,
            model_version: self.model_version,
            finish_reason,
            usage: self.usage_metadata.map(|usage| TokenUsage {
                prompt_tokens: usage.prompt_token_count,
                candidates_tokens: usage.candidates_token_count,
                total_tokens: usage.total_token_count,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseCandidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorEnvelope {
    error: Option<ProviderErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: Option<String>,
}
