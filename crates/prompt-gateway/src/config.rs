use thiserror::Error;
use tracing::warn;

use crate::config_env::{
    optional_path_env, optional_trimmed_env, parse_bool_env, parse_enum_env, parse_http_url_env,
    parse_millis_env,
};
use crate::llm::gemini::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, DEFAULT_TIMEOUT_MS,
    GeminiClientConfig,
};
use crate::llm::keys::{ExecutionContext, KeySourcesConfig};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub client: GeminiClientConfig,
    pub execution_context: ExecutionContext,
    pub memoize_key: bool,
    pub key_sources: KeySourcesConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub gateway: GatewayConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid integer in env var {0}")]
    ParseInt(String),
    #[error("invalid boolean in env var {0}")]
    ParseBool(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to load .env file: {0}")]
    Dotenv(String),
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let execution_context =
            parse_enum_env("GATEWAY_EXECUTION_CONTEXT", ExecutionContext::Server)?;
        let injected_key = optional_trimmed_env("GATEWAY_INJECTED_KEY");
        if injected_key.is_some() && execution_context == ExecutionContext::Server {
            warn!("GATEWAY_INJECTED_KEY is ignored in the server execution context");
        }

        let model = optional_trimmed_env("GEMINI_MODEL")
            .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
        if model.contains('/') {
            return Err(ConfigError::InvalidConfiguration(
                "GEMINI_MODEL must be a bare model name".to_string(),
            ));
        }

        Ok(Self {
            client: GeminiClientConfig {
                base_url: parse_http_url_env("GEMINI_API_BASE_URL", DEFAULT_GEMINI_BASE_URL)?,
                model,
                timeout: parse_millis_env("GATEWAY_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
                connect_timeout: parse_millis_env(
                    "GATEWAY_CONNECT_TIMEOUT_MS",
                    DEFAULT_CONNECT_TIMEOUT_MS,
                )?,
            },
            execution_context,
            memoize_key: parse_bool_env("GATEWAY_MEMOIZE_KEY", true)?,
            key_sources: KeySourcesConfig {
                injected_key,
                override_path: optional_path_env("GATEWAY_KEY_OVERRIDE_PATH"),
            },
        })
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_addr: optional_trimmed_env("API_BIND_ADDR")
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            gateway: GatewayConfig::from_env()?,
        })
    }
}

/// Loads `.env` from the working directory when present. A missing file is fine.
pub fn load_dotenv() -> Result<(), ConfigError> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(ConfigError::Dotenv(err.to_string())),
    }
}
