use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use prompt_gateway::llm::{AdapterKind, ErrorKind};
use tracing::{info, warn};
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_REQUEST_ID_LEN: usize = 128;
const HTTP_METRIC_NAME: &str = "gateway_http_request";

#[derive(Clone, Debug)]
pub(super) struct RequestContext {
    pub(super) request_id: String,
}

/// What an adapter route ran and how it ended, carried on the response so the
/// access log line can name it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct AdapterOutcome {
    pub(super) adapter: AdapterKind,
    pub(super) error_kind: Option<ErrorKind>,
}

impl AdapterOutcome {
    pub(super) fn attach(self, mut response: Response) -> Response {
        response.extensions_mut().insert(self);
        response
    }
}

pub(super) async fn access_log_middleware(mut req: Request, next: Next) -> Response {
    let request_id = request_id_from(req.headers());
    req.extensions_mut().insert(RequestContext {
        request_id: request_id.clone(),
    });

    let method = req.method().clone();
    let route = match req.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_string(),
        None => req.uri().path().to_string(),
    };
    let started_at = Instant::now();

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    let outcome = response.extensions().get::<AdapterOutcome>().copied();
    let adapter = outcome.map(|outcome| outcome.adapter.as_str());
    let error_kind = outcome
        .and_then(|outcome| outcome.error_kind)
        .map(ErrorKind::as_str);
    let status = response.status().as_u16();
    let latency_ms = u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX);

    if response.status().is_server_error() {
        warn!(
            metric_name = HTTP_METRIC_NAME,
            request_id = %request_id,
            method = %method,
            route = %route,
            adapter,
            error_kind,
            status,
            latency_ms,
            "gateway route failed"
        );
    } else {
        info!(
            metric_name = HTTP_METRIC_NAME,
            request_id = %request_id,
            method = %method,
            route = %route,
            adapter,
            error_kind,
            status,
            latency_ms,
            "gateway route served"
        );
    }

    response
}

/// Caller ids are echoed when they are short and header-safe; anything else is
/// replaced with a fresh v4 uuid.
fn request_id_from(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|candidate| is_header_safe_id(candidate))
        .map_or_else(|| Uuid::new_v4().to_string(), ToString::to_string)
}

fn is_header_safe_id(candidate: &str) -> bool {
    (1..=MAX_REQUEST_ID_LEN).contains(&candidate.len())
        && candidate
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.'))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Router, middleware};
    use prompt_gateway::llm::{AdapterKind, ErrorKind};
    use tower::ServiceExt;

    use super::{AdapterOutcome, REQUEST_ID_HEADER, access_log_middleware, request_id_from};

    fn headers_with(id: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(REQUEST_ID_HEADER, HeaderValue::from_str(id).expect("header value"));
        headers
    }

    #[test]
    fn header_safe_request_ids_are_echoed_trimmed() {
        assert_eq!(request_id_from(&headers_with(" req-123._abc ")), "req-123._abc");
    }

    #[test]
    fn unsafe_or_missing_request_ids_are_regenerated() {
        let oversized = "x".repeat(129);
        for id in ["abc$123", "a b", oversized.as_str()] {
            let generated = request_id_from(&headers_with(id));
            assert_ne!(generated, id.trim());
            assert_eq!(generated.len(), 36, "uuid expected for {id:?}");
        }
        assert_eq!(request_id_from(&HeaderMap::new()).len(), 36);
    }

    #[tokio::test]
    async fn adapter_outcome_survives_the_middleware() {
        async fn failing_route() -> Response {
            AdapterOutcome {
                adapter: AdapterKind::LeadScore,
                error_kind: Some(ErrorKind::Schema),
            }
            .attach(StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
        let app = Router::new()
            .route("/score", get(failing_route))
            .layer(middleware::from_fn(access_log_middleware));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/score")
                    .header("x-request-id", "req-outcome")
                    .body(Body::empty())
                    .expect("request should build"),
            )
            .await
            .expect("request should succeed");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get("x-request-id").and_then(|v| v.to_str().ok()),
            Some("req-outcome")
        );
        assert_eq!(
            response.extensions().get::<AdapterOutcome>().copied(),
            Some(AdapterOutcome {
                adapter: AdapterKind::LeadScore,
                error_kind: Some(ErrorKind::Schema),
            })
        );
    }
}
