use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;

use super::{fallback, json_response, read_body, respond, with_logging, RequestGate};
use crate::protocol::{routes, HealthStatus};
use crate::rank::{RankRequest, RankResponse, RankService};
use crate::validate;
use crate::Result;

/// Shared state of the ranking service
#[derive(Clone)]
pub struct RankerState {
    service: Arc<RankService>,
    port: u16,
    gate: RequestGate,
}

impl RankerState {
    pub fn new(service: Arc<RankService>, port: u16, max_concurrent_requests: usize) -> Self {
        Self {
            service,
            port,
            gate: RequestGate::new(max_concurrent_requests),
        }
    }
}

pub fn ranker_router(state: RankerState) -> Router {
    let router = Router::new()
        .route(routes::HEALTH, get(health).fallback(fallback))
        .route(routes::RANK, post(rank).fallback(fallback))
        .fallback(fallback)
        .with_state(state);
    with_logging(router)
}

async fn health(State(state): State<RankerState>) -> Response {
    let status = HealthStatus::new(
        state.service.model_name(),
        state.port,
        state.service.engine_state(),
    );
    json_response(StatusCode::OK, &status)
}

async fn rank(State(state): State<RankerState>, headers: HeaderMap, body: Body) -> Response {
    respond(handle_rank(&state, &headers, body).await)
}

async fn handle_rank(state: &RankerState, headers: &HeaderMap, body: Body) -> Result<RankResponse> {
    let limit = state.service.policy().max_body_bytes;
    let bytes = read_body(headers, body, Some(limit)).await?;
    let request: RankRequest = validate::parse_body(&bytes, validate::ERR_RANK_FIELDS)?;

    let _permit = state.gate.acquire().await?;
    state.service.rank(request).await
}
