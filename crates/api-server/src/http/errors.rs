use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use prompt_gateway::llm::{ErrorKind, GatewayError};
use prompt_gateway::models::ErrorResponse;

/// The gateway has already logged the failure detail; callers only get the
/// public message.
pub(super) fn gateway_error_response(err: &GatewayError) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    error_response(status, err.kind().as_str(), &err.public_message())
}

pub(super) fn bad_request_response(message: &str) -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        ErrorKind::InvalidRequest.as_str(),
        message,
    )
}

pub(super) async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "not_found", "Route not found")
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
            code: code.to_string(),
        }),
    )
        .into_response()
}
