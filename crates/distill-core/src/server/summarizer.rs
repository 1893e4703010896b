use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;

use super::{fallback, json_response, read_body, respond, with_logging, RequestGate};
use crate::protocol::{routes, HealthStatus};
use crate::summarize::{SummarizeRequest, SummarizeResponse, SummarizeService};
use crate::validate;
use crate::Result;

/// Shared state of the summarization service
#[derive(Clone)]
pub struct SummarizerState {
    service: Arc<SummarizeService>,
    port: u16,
    gate: RequestGate,
    /// Unlimited unless configured
    body_limit: Option<u64>,
}

impl SummarizerState {
    pub fn new(service: Arc<SummarizeService>, port: u16, max_concurrent_requests: usize) -> Self {
        Self {
            service,
            port,
            gate: RequestGate::new(max_concurrent_requests),
            body_limit: None,
        }
    }

    pub fn with_body_limit(mut self, limit: Option<u64>) -> Self {
        self.body_limit = limit;
        self
    }
}

pub fn summarizer_router(state: SummarizerState) -> Router {
    let router = Router::new()
        .route(routes::HEALTH, get(health).fallback(fallback))
        .route(routes::SUMMARIZE, post(summarize).fallback(fallback))
        .fallback(fallback)
        .with_state(state);
    with_logging(router)
}

async fn health(State(state): State<SummarizerState>) -> Response {
    let status = HealthStatus::new(
        state.service.model_name(),
        state.port,
        state.service.engine_state(),
    );
    json_response(StatusCode::OK, &status)
}

async fn summarize(
    State(state): State<SummarizerState>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    respond(handle_summarize(&state, &headers, body).await)
}

async fn handle_summarize(
    state: &SummarizerState,
    headers: &HeaderMap,
    body: Body,
) -> Result<SummarizeResponse> {
    let bytes = read_body(headers, body, state.body_limit).await?;
    let request: SummarizeRequest = validate::parse_summarize(&bytes)?;

    let _permit = state.gate.acquire().await?;
    state.service.summarize(request).await
}
