use std::sync::Arc;

use axum::routing::{get, post};
use axum::{Router, middleware};
use prompt_gateway::llm::Gateway;
use tokio_util::sync::CancellationToken;

mod adapters;
mod errors;
mod health;
mod observability;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    /// Cancelled on shutdown; every provider call runs under a child token.
    pub shutdown: CancellationToken,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/v1/tickets/analysis", post(adapters::analyze_ticket))
        .route("/v1/case-studies/draft", post(adapters::draft_case_study))
        .route("/v1/knowledge/answer", post(adapters::answer_question))
        .route("/v1/leads/score", post(adapters::score_lead))
        .route("/v1/voice/intent", post(adapters::extract_voice_intent))
        .route("/v1/generate", post(adapters::generate_content))
        .fallback(errors::not_found)
        .layer(middleware::from_fn(
            observability::access_log_middleware,
        ))
        .with_state(app_state)
}
