use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::adapters::Adapter;
use super::contracts::{AdapterKind, OutputFormat};
use super::errors::GatewayError;
use super::gateway::{CompletionClient, RawProviderResponse, TokenUsage};
use super::gemini::{GeminiClient, GeminiClientError};
use super::keys::{KeyCandidateSet, KeyResolver};
use super::observability::{log_request_telemetry, telemetry_for_request};
use super::prompts::build;
use super::sanitize::{sanitize, sanitize_free_text};
use crate::config::GatewayConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    KeyResolved,
    Built,
    Requested,
    SucceededRaw,
    Sanitized,
    ParsedSuccess,
    ParsedFailed,
    Failed,
}

impl RequestState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::KeyResolved => "key_resolved",
            Self::Built => "built",
            Self::Requested => "requested",
            Self::SucceededRaw => "succeeded_raw",
            Self::Sanitized => "sanitized",
            Self::ParsedSuccess => "parsed_success",
            Self::ParsedFailed => "parsed_failed",
            Self::Failed => "failed",
        }
    }
}

/// Provider envelope metadata kept for telemetry; the generated text is not retained.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSnapshot {
    pub status: u16,
    pub model_version: Option<String>,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

/// States one request visited, in order.
#[derive(Debug, Clone)]
pub struct RequestTrace {
    adapter: AdapterKind,
    states: Vec<RequestState>,
    provider: Option<ProviderSnapshot>,
}

impl RequestTrace {
    pub(crate) fn new(adapter: AdapterKind) -> Self {
        Self {
            adapter,
            states: vec![RequestState::Idle],
            provider: None,
        }
    }

    pub(crate) fn advance(&mut self, state: RequestState) {
        debug!(adapter = %self.adapter, state = state.as_str(), "request state");
        self.states.push(state);
    }

    pub(crate) fn record_response(&mut self, response: &RawProviderResponse) {
        self.provider = Some(ProviderSnapshot {
            status: response.status,
            model_version: response.model_version.clone(),
            finish_reason: response.finish_reason.clone(),
            usage: response.usage.clone(),
        });
    }

    pub fn adapter(&self) -> AdapterKind {
        self.adapter
    }

    pub fn states(&self) -> &[RequestState] {
        &self.states
    }

    pub fn last(&self) -> Option<RequestState> {
        self.states.last().copied()
    }

    pub fn reached(&self, state: RequestState) -> bool {
        self.states.contains(&state)
    }

    pub fn provider(&self) -> Option<&ProviderSnapshot> {
        self.provider.as_ref()
    }
}

/// Runs adapters end to end: validate, resolve key, build, invoke, sanitize, parse.
/// Shared across tasks behind an `Arc`; the memoized key is the only mutable state.
pub struct Gateway {
    keys: KeyResolver,
    client: Arc<dyn CompletionClient>,
}

impl Gateway {
    pub fn new(keys: KeyResolver, client: Arc<dyn CompletionClient>) -> Self {
        Self { keys, client }
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, GeminiClientError> {
        let candidates =
            KeyCandidateSet::for_context(config.execution_context, &config.key_sources);
        let keys = if config.memoize_key {
            KeyResolver::memoized(candidates)
        } else {
            KeyResolver::new(candidates)
        };
        let client = GeminiClient::new(config.client.clone())?;
        info!(
            execution_context = config.execution_context.as_str(),
            memoize_key = config.memoize_key,
            endpoint = client.endpoint(),
            "gateway configured"
        );

        Ok(Self::new(keys, Arc::new(client)))
    }

    pub fn keys(&self) -> &KeyResolver {
        &self.keys
    }

    pub async fn run<A: Adapter>(
        &self,
        adapter: &A,
        input: &A::Input,
    ) -> Result<A::Output, GatewayError> {
        self.execute(adapter, input, None).await.0
    }

    pub async fn run_traced<A: Adapter>(
        &self,
        adapter: &A,
        input: &A::Input,
    ) -> (Result<A::Output, GatewayError>, RequestTrace) {
        self.execute(adapter, input, None).await
    }

    /// Like `run_traced`, but abandons the provider call as soon as `cancel` fires.
    pub async fn run_cancellable<A: Adapter>(
        &self,
        adapter: &A,
        input: &A::Input,
        cancel: &CancellationToken,
    ) -> (Result<A::Output, GatewayError>, RequestTrace) {
        self.execute(adapter, input, Some(cancel)).await
    }

    async fn execute<A: Adapter>(
        &self,
        adapter: &A,
        input: &A::Input,
        cancel: Option<&CancellationToken>,
    ) -> (Result<A::Output, GatewayError>, RequestTrace) {
        let started_at = Instant::now();
        let mut trace = RequestTrace::new(adapter.kind());

        let result = self.drive(adapter, input, cancel, &mut trace).await;
        match &result {
            Ok(_) => trace.advance(RequestState::ParsedSuccess),
            Err(_) if trace.reached(RequestState::Sanitized) => {
                trace.advance(RequestState::ParsedFailed);
            }
            Err(_) => trace.advance(RequestState::Failed),
        }

        if let Err(err) = &result {
            err.log(adapter.kind());
        }
        let telemetry = telemetry_for_request(&trace, started_at.elapsed(), result.as_ref().err());
        log_request_telemetry(&telemetry);

        (result, trace)
    }

    async fn drive<A: Adapter>(
        &self,
        adapter: &A,
        input: &A::Input,
        cancel: Option<&CancellationToken>,
        trace: &mut RequestTrace,
    ) -> Result<A::Output, GatewayError> {
        adapter.validate(input)?;
        let template = adapter.template(input)?;

        let key = self.keys.resolve()?;
        trace.advance(RequestState::KeyResolved);

        let request = build(&template, &adapter.variables(input))?;
        trace.advance(RequestState::Built);

        trace.advance(RequestState::Requested);
        let invocation = self.client.invoke(&request, &key);
        let outcome = match cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => Err(GatewayError::Cancelled),
                result = invocation => result,
            },
            None => invocation.await,
        };

        let raw = match outcome {
            Ok(raw) => raw,
            Err(err) => {
                if let GatewayError::Provider {
                    status: 401 | 403, ..
                } = &err
                {
                    self.keys.invalidate();
                }
                return Err(err);
            }
        };
        trace.advance(RequestState::SucceededRaw);
        trace.record_response(&raw);

        let text = match adapter.kind().output_format() {
            OutputFormat::FreeText => sanitize_free_text(&raw.text),
            OutputFormat::Structured => sanitize(&raw.text),
        };
        trace.advance(RequestState::Sanitized);

        adapter.parse(input, text)
    }
}
