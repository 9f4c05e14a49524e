use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::routing::post;
use axum::{Json, Router};
use prompt_gateway::llm::{
    ApiKey, CompletionClient, GatewayError, GeminiClient, GeminiClientConfig, GenerationConfig,
    KeyCandidate, KeyCandidateSet, KeyResolver, PromptRequest, TransportFailure,
};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

const TEST_KEY: &str = "test-gemini-key-123";

#[derive(Debug, Clone)]
struct MockReply {
    status: StatusCode,
    body: String,
    delay: Duration,
}

impl MockReply {
    fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
struct SeenRequest {
    call: String,
    query: HashMap<String, String>,
    body: Value,
}

#[derive(Debug, Clone)]
struct TestServerState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl TestServerState {
    fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[tokio::test]
async fn sends_flattened_prompt_and_query_key_and_reads_first_part() {
    let state = TestServerState::with_replies(vec![MockReply::json(
        StatusCode::OK,
        success_body("Ticket looks like an auth outage."),
    )]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = GeminiClient::new(config_for(base_url, Duration::from_secs(5)))
        .expect("client should build");
    let response = client
        .invoke(&prompt_request(), &api_key())
        .await
        .expect("provider call should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(response.status, 200);
    assert_eq!(response.text, "Ticket looks like an auth outage.");

    let seen = state.seen.lock().await.clone();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].call, "gemini-test:generateContent");
    assert_eq!(seen[0].query.get("key").map(String::as_str), Some(TEST_KEY));
    assert_eq!(
        seen[0].body,
        json!({
            "contents": [{ "parts": [{ "text": "You are terse.\n\nSummarize: hello" }] }],
            "generationConfig": { "temperature": 0.3, "maxOutputTokens": 256 }
        })
    );
}

#[tokio::test]
async fn rate_limit_surfaces_provider_status_and_message_verbatim() {
    let state = TestServerState::with_replies(vec![MockReply::json(
        StatusCode::TOO_MANY_REQUESTS,
        json!({ "error": { "code": 429, "message": "rate limited", "status": "RESOURCE_EXHAUSTED" } }),
    )]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = GeminiClient::new(config_for(base_url, Duration::from_secs(5)))
        .expect("client should build");
    let err = client
        .invoke(&prompt_request(), &api_key())
        .await
        .expect_err("429 must fail");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(
        matches!(&err, GatewayError::Provider { status: 429, message } if message == "rate limited"),
        "unexpected error: {err:?}"
    );
    assert_eq!(state.seen.lock().await.len(), 1, "the client never retries");
}

#[tokio::test]
async fn slow_provider_is_a_timeout_transport_error() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: success_body("too late").to_string(),
        delay: Duration::from_millis(800),
    }]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state).await;

    let client = GeminiClient::new(config_for(base_url, Duration::from_millis(100)))
        .expect("client should build");
    let err = client
        .invoke(&prompt_request(), &api_key())
        .await
        .expect_err("slow provider must time out");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(
        matches!(
            err,
            GatewayError::Transport {
                failure: TransportFailure::Timeout,
                ..
            }
        ),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn unreachable_provider_is_a_transport_error_without_the_key() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("listener address should resolve");
    drop(listener);

    let client = GeminiClient::new(config_for(
        format!("http://{addr}/v1beta"),
        Duration::from_secs(5),
    ))
    .expect("client should build");
    let err = client
        .invoke(&prompt_request(), &api_key())
        .await
        .expect_err("closed port must fail");

    assert!(matches!(err, GatewayError::Transport { .. }), "unexpected error: {err:?}");
    assert!(!err.to_string().contains(TEST_KEY));
    assert!(!format!("{err:?}").contains(TEST_KEY));
}

#[tokio::test]
async fn empty_envelope_yields_empty_text_and_garbage_is_a_body_error() {
    let state = TestServerState::with_replies(vec![
        MockReply::json(StatusCode::OK, json!({ "candidates": [] })),
        MockReply {
            status: StatusCode::OK,
            body: "<html>not json</html>".to_string(),
            delay: Duration::ZERO,
        },
    ]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state).await;

    let client = GeminiClient::new(config_for(base_url, Duration::from_secs(5)))
        .expect("client should build");
    let empty = client
        .invoke(&prompt_request(), &api_key())
        .await
        .expect("empty envelope is still a success");
    let garbage = client
        .invoke(&prompt_request(), &api_key())
        .await
        .expect_err("non-json envelope must fail");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(empty.text, "");
    assert!(
        matches!(
            garbage,
            GatewayError::Transport {
                failure: TransportFailure::Body,
                ..
            }
        ),
        "unexpected error: {garbage:?}"
    );
}

#[tokio::test]
async fn provider_error_without_message_falls_back_to_status_reason() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::SERVICE_UNAVAILABLE,
        body: String::new(),
        delay: Duration::ZERO,
    }]);
    let (base_url, shutdown_tx, server_task) = spawn_test_server(state).await;

    let client = GeminiClient::new(config_for(base_url, Duration::from_secs(5)))
        .expect("client should build");
    let err = client
        .invoke(&prompt_request(), &api_key())
        .await
        .expect_err("503 must fail");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(
        matches!(&err, GatewayError::Provider { status: 503, message } if message == "Service Unavailable"),
        "unexpected error: {err:?}"
    );
    assert!(err.is_retryable());
}

#[tokio::test]
async fn truncated_error_body_keeps_the_provider_status() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("listener address should resolve");

    let server_task = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("client should connect");
        let mut request = Vec::new();
        let mut chunk = [0_u8; 4096];
        while !request_is_complete(&request) {
            let read = socket.read(&mut chunk).await.expect("request should read");
            if read == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..read]);
        }
        socket
            .write_all(
                b"HTTP/1.1 502 Bad Gateway\r\ncontent-type: application/json\r\ncontent-length: 200\r\n\r\n{\"error\":",
            )
            .await
            .expect("partial response should write");
        socket.shutdown().await.expect("socket should close");
    });

    let client = GeminiClient::new(config_for(
        format!("http://{addr}/v1beta"),
        Duration::from_secs(5),
    ))
    .expect("client should build");
    let err = client
        .invoke(&prompt_request(), &api_key())
        .await
        .expect_err("502 must fail");
    server_task.await.expect("server task should join");

    assert!(
        matches!(&err, GatewayError::Provider { status: 502, message } if message == "Bad Gateway"),
        "unexpected error: {err:?}"
    );
}

/// Headers received and as many body bytes as `content-length` announced.
fn request_is_complete(request: &[u8]) -> bool {
    let text = String::from_utf8_lossy(request);
    let Some((head, body)) = text.split_once("\r\n\r\n") else {
        return false;
    };
    let length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    body.len() >= length
}

fn api_key() -> ApiKey {
    KeyResolver::new(KeyCandidateSet::new(vec![KeyCandidate::injected(Some(
        TEST_KEY.to_string(),
    ))]))
    .resolve()
    .expect("injected key should resolve")
}

fn prompt_request() -> PromptRequest {
    PromptRequest::new(
        "You are terse.",
        "Summarize: hello",
        GenerationConfig::new(0.3, 256).expect("generation config should be valid"),
    )
}

fn config_for(base_url: String, timeout: Duration) -> GeminiClientConfig {
    GeminiClientConfig {
        base_url,
        model: "gemini-test".to_string(),
        timeout,
        connect_timeout: Duration::from_secs(1),
    }
}

fn success_body(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": { "parts": [{ "text": text }], "role": "model" },
            "finishReason": "STOP"
        }],
        "modelVersion": "gemini-test-001"
    })
}

async fn spawn_test_server(
    state: TestServerState,
) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/v1beta/models/{call}", post(test_generate_content_handler))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

        server.await.expect("test server should run");
    });

    (format!("http://{local_addr}/v1beta"), shutdown_tx, server_task)
}

async fn test_generate_content_handler(
    State(state): State<TestServerState>,
    Path(call): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    state.seen.lock().await.push(SeenRequest { call, query, body });

    let reply = state.replies.lock().await.pop_front().unwrap_or(MockReply::json(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": { "message": "exhausted test replies" } }),
    ));
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    (
        reply.status,
        [(header::CONTENT_TYPE, "application/json")],
        reply.body,
    )
}
