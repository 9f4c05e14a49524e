use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use prompt_gateway::llm::{
    Adapter, CaseStudyAdapter, CaseStudyInput, ErrorKind, GatewayError, GenerateContentInput,
    GeneratedContentAdapter, KnowledgeAnswerAdapter, KnowledgeQuestionInput, LeadInput,
    LeadScoreAdapter, TicketAnalysisAdapter, TicketAnalysisInput, VoiceCommandInput,
    VoiceIntentAdapter,
};
use serde::Serialize;
use tracing::{Instrument, info_span};

use super::AppState;
use super::errors::{bad_request_response, gateway_error_response};
use super::observability::{AdapterOutcome, RequestContext};

pub(super) async fn analyze_ticket(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    payload: Result<Json<TicketAnalysisInput>, JsonRejection>,
) -> Response {
    run_adapter(&state, &context, &TicketAnalysisAdapter, payload).await
}

pub(super) async fn draft_case_study(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    payload: Result<Json<CaseStudyInput>, JsonRejection>,
) -> Response {
    run_adapter(&state, &context, &CaseStudyAdapter, payload).await
}

pub(super) async fn answer_question(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    payload: Result<Json<KnowledgeQuestionInput>, JsonRejection>,
) -> Response {
    run_adapter(&state, &context, &KnowledgeAnswerAdapter, payload).await
}

pub(super) async fn score_lead(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    payload: Result<Json<LeadInput>, JsonRejection>,
) -> Response {
    run_adapter(&state, &context, &LeadScoreAdapter, payload).await
}

pub(super) async fn extract_voice_intent(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    payload: Result<Json<VoiceCommandInput>, JsonRejection>,
) -> Response {
    run_adapter(&state, &context, &VoiceIntentAdapter, payload).await
}

pub(super) async fn generate_content(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    payload: Result<Json<GenerateContentInput>, JsonRejection>,
) -> Response {
    run_adapter(&state, &context, &GeneratedContentAdapter, payload).await
}

async fn run_adapter<A>(
    state: &AppState,
    context: &RequestContext,
    adapter: &A,
    payload: Result<Json<A::Input>, JsonRejection>,
) -> Response
where
    A: Adapter,
    A::Output: Serialize,
{
    let Json(input) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return AdapterOutcome {
                adapter: adapter.kind(),
                error_kind: Some(ErrorKind::InvalidRequest),
            }
            .attach(bad_request_response(&rejection.body_text()));
        }
    };

    let cancel = state.shutdown.child_token();
    let span = info_span!(
        "adapter_request",
        request_id = %context.request_id,
        adapter = %adapter.kind()
    );
    let (result, trace) = state
        .gateway
        .run_cancellable(adapter, &input, &cancel)
        .instrument(span)
        .await;
    let outcome = AdapterOutcome {
        adapter: trace.adapter(),
        error_kind: result.as_ref().err().map(GatewayError::kind),
    };

    let response = match result {
        Ok(output) => (StatusCode::OK, Json(output)).into_response(),
        Err(err) => gateway_error_response(&err),
    };
    outcome.attach(response)
}
