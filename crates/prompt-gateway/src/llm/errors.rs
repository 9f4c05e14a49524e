use std::fmt;

use thiserror::Error;
use tracing::{error, warn};

use super::contracts::AdapterKind;

/// Upper bound on how many schema violations are carried in one error.
const MAX_REPORTED_VIOLATIONS: usize = 8;

/// HTTP status used for requests the caller abandoned (nginx convention).
pub const CLIENT_CLOSED_REQUEST_STATUS: u16 = 499;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    Timeout,
    Connect,
    Body,
}

impl TransportFailure {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Body => "body",
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no usable provider credential among sources: {}", .tried_sources.join(", "))]
    Configuration { tried_sources: Vec<String> },
    #[error("provider transport failed ({failure}): {detail}")]
    Transport {
        failure: TransportFailure,
        detail: String,
    },
    #[error("provider rejected the request with status {status}: {message}")]
    Provider { status: u16, message: String },
    #[error("{adapter} output is not valid json: {detail}")]
    Parse { adapter: AdapterKind, detail: String },
    #[error("{adapter} output violates its contract: {violations:?}")]
    Schema {
        adapter: AdapterKind,
        violations: Vec<String>,
    },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("request was cancelled by the caller")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Transport,
    Provider,
    Parse,
    Schema,
    InvalidRequest,
    Cancelled,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration_error",
            Self::Transport => "transport_error",
            Self::Provider => "provider_error",
            Self::Parse => "parse_error",
            Self::Schema => "schema_error",
            Self::InvalidRequest => "invalid_request",
            Self::Cancelled => "cancelled",
        }
    }
}

impl GatewayError {
    pub fn transport(failure: TransportFailure, detail: impl Into<String>) -> Self {
        Self::Transport {
            failure,
            detail: detail.into(),
        }
    }

    pub fn schema(adapter: AdapterKind, mut violations: Vec<String>) -> Self {
        violations.truncate(MAX_REPORTED_VIOLATIONS);
        Self::Schema {
            adapter,
            violations,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Provider { .. } => ErrorKind::Provider,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Schema { .. } => ErrorKind::Schema,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Status code reported to callers. Provider statuses pass through when they
    /// are a real error status; everything else internal maps to 500.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Provider { status, .. } if (400..=599).contains(status) => *status,
            Self::InvalidRequest(_) => 400,
            Self::Cancelled => CLIENT_CLOSED_REQUEST_STATUS,
            Self::Configuration { .. }
            | Self::Transport { .. }
            | Self::Provider { .. }
            | Self::Parse { .. }
            | Self::Schema { .. } => 500,
        }
    }

    /// Message safe to hand back to a caller: no credential sources, no transport
    /// internals, no raw model output.
    pub fn public_message(&self) -> String {
        match self {
            Self::Configuration { .. } => "AI service is not configured".to_string(),
            Self::Transport {
                failure: TransportFailure::Timeout,
                ..
            } => "AI service did not respond in time".to_string(),
            Self::Transport { .. } => "AI service is unreachable".to_string(),
            Self::Provider { message, .. } => message.clone(),
            Self::Parse { .. } => "AI service returned an unreadable response".to_string(),
            Self::Schema { .. } => "AI service returned an incomplete response".to_string(),
            Self::InvalidRequest(message) => message.clone(),
            Self::Cancelled => "request was cancelled".to_string(),
        }
    }

    /// Advisory only; the gateway itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Provider { status, .. } => matches!(status, 408 | 429 | 500..=599),
            _ => false,
        }
    }

    pub(crate) fn log(&self, adapter: AdapterKind) {
        match self {
            Self::Configuration { .. } => {
                error!(adapter = %adapter, error_kind = self.kind().as_str(), "{self}");
            }
            Self::InvalidRequest(_) | Self::Cancelled => {}
            _ => {
                warn!(
                    adapter = %adapter,
                    error_kind = self.kind().as_str(),
                    status = self.status_code(),
                    "{self}"
                );
            }
        }
    }
}
