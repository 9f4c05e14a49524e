use std::time::Duration;

use tracing::{info, warn};

use super::errors::GatewayError;
use super::pipeline::{RequestState, RequestTrace};

pub const METRIC_NAME: &str = "gateway_request";

/// One structured event per request. Built from the request's own trace only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTelemetry {
    pub adapter: &'static str,
    pub outcome: &'static str,
    pub final_state: &'static str,
    pub latency_ms: u64,
    pub status: Option<u16>,
    pub error_kind: Option<&'static str>,
    pub model_version: Option<String>,
    pub finish_reason: Option<String>,
    pub prompt_tokens: Option<u32>,
    pub candidates_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

pub fn telemetry_for_request(
    trace: &RequestTrace,
    latency: Duration,
    error: Option<&GatewayError>,
) -> RequestTelemetry {
    let provider = trace.provider();
    let usage = provider.and_then(|provider| provider.usage.as_ref());

    RequestTelemetry {
        adapter: trace.adapter().as_str(),
        outcome: if error.is_none() { "success" } else { "failure" },
        final_state: trace
            .last()
            .map(RequestState::as_str)
            .unwrap_or(RequestState::Idle.as_str()),
        latency_ms: duration_to_millis(latency),
        status: match error {
            Some(err) => Some(err.status_code()),
            None => provider.map(|provider| provider.status),
        },
        error_kind: error.map(|err| err.kind().as_str()),
        model_version: provider.and_then(|provider| provider.model_version.clone()),
        finish_reason: provider.and_then(|provider| provider.finish_reason.clone()),
        prompt_tokens: usage.map(|usage| usage.prompt_tokens),
        candidates_tokens: usage.map(|usage| usage.candidates_tokens),
        total_tokens: usage.map(|usage| usage.total_tokens),
    }
}

pub fn log_request_telemetry(telemetry: &RequestTelemetry) {
    if telemetry.error_kind.is_none() {
        info!(
            metric_name = METRIC_NAME,
            adapter = telemetry.adapter,
            outcome = telemetry.outcome,
            final_state = telemetry.final_state,
            latency_ms = telemetry.latency_ms,
            status = ?telemetry.status,
            model_version = ?telemetry.model_version,
            finish_reason = ?telemetry.finish_reason,
            prompt_tokens = ?telemetry.prompt_tokens,
            candidates_tokens = ?telemetry.candidates_tokens,
            total_tokens = ?telemetry.total_tokens,
            "gateway request completed"
        );
    } else {
        warn!(
            metric_name = METRIC_NAME,
            adapter = telemetry.adapter,
            outcome = telemetry.outcome,
            final_state = telemetry.final_state,
            latency_ms = telemetry.latency_ms,
            status = ?telemetry.status,
            error_kind = ?telemetry.error_kind,
            model_version = ?telemetry.model_version,
            finish_reason = ?telemetry.finish_reason,
            "gateway request failed"
        );
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
