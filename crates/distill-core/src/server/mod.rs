//! HTTP transport for the ranking and summarization services.
//!
//! Each service is an axum router over a shared, lazily loaded model. JSON
//! responses carry `Access-Control-Allow-Origin: *`; `OPTIONS` on any path is
//! answered as a CORS preflight and every other unknown route gets an empty 404.

mod ranker;
mod summarizer;


pub use ranker::{ranker_router, RankerState};
pub use summarizer::{summarizer_router, SummarizerState};

use std::sync::Arc;
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, Instrument};
use uuid::Uuid;

use crate::config::{AppConfig, GeneralConfig};
use crate::models::{CrossEncoderLoader, T5Loader};
use crate::protocol::ErrorBody;
use crate::rank::RankService;
use crate::summarize::SummarizeService;
use crate::validate;
use crate::{Error, Result};

const JSON_CONTENT_TYPE: &str = "application/json";

pub(crate) fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => (
            status,
            [
                (header::CONTENT_TYPE, JSON_CONTENT_TYPE),
                (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub(crate) fn error_response(err: &Error) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        error!("Request failed: {}", err);
    } else {
        debug!("Request rejected ({}): {}", status.as_u16(), err);
    }
    json_response(
        status,
        &ErrorBody {
            error: err.to_string(),
        },
    )
}

pub(crate) fn respond<T: Serialize>(result: Result<T>) -> Response {
    match result {
        Ok(body) => json_response(StatusCode::OK, &body),
        Err(e) => error_response(&e),
    }
}

fn preflight() -> Response {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        ],
    )
        .into_response()
}

/// Anything that is not a known route and method
pub(crate) async fn fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        preflight()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn log_request(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let span = tracing::info_span!("request", id = %request_id);

    let started = Instant::now();
    let response = next.run(request).instrument(span.clone()).await;
    let _entered = span.enter();
    info!(
        "{} {} -> {} in {:.1?}",
        method,
        path,
        response.status().as_u16(),
        started.elapsed()
    );
    response
}

pub(crate) fn with_logging<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(axum::middleware::from_fn(log_request))
}

/// Read the full request body. With a `limit`, a declared length over the
/// limit is rejected before anything is read.
pub(crate) async fn read_body(headers: &HeaderMap, body: Body, limit: Option<u64>) -> Result<Bytes> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());

    match limit {
        Some(limit) => {
            validate::check_content_length(declared, limit)?;
            let max = usize::try_from(limit).unwrap_or(usize::MAX);
            axum::body::to_bytes(body, max)
                .await
                .map_err(|_| Error::PayloadTooLarge {
                    declared: None,
                    limit,
                })
        }
        None => axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|e| Error::InvalidRequest(format!("Failed to read request body: {}", e))),
    }
}

/// Concurrency gate for inference requests. Health checks bypass it.
#[derive(Clone)]
pub(crate) struct RequestGate {
    semaphore: Arc<Semaphore>,
}

impl RequestGate {
    pub(crate) fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub(crate) async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| Error::Other(format!("Failed to acquire request permit: {}", e)))
    }
}

pub async fn bind(general: &GeneralConfig, port: u16) -> Result<TcpListener> {
    let listener = TcpListener::bind((general.bind_address.as_str(), port)).await?;
    Ok(listener)
}

/// Serve `router` until `shutdown` flips to true or its sender goes away.
pub async fn serve(
    router: Router,
    listener: TcpListener,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            while shutdown.changed().await.is_ok() {
                if *shutdown.borrow() {
                    break;
                }
            }
            info!("HTTP server shutting down");
        })
        .await?;
    Ok(())
}

/// Run the relevance ranking service backed by the configured cross-encoder.
pub async fn run_ranker(
    config: Arc<AppConfig>,
    port: u16,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let loader = Arc::new(CrossEncoderLoader::new(
        config.ranker.clone(),
        config.model_cache_dir(),
    ));
    let service = Arc::new(RankService::new(loader, config.policy()));
    let state = RankerState::new(service, port, config.general.max_concurrent_requests);

    let listener = bind(&config.general, port).await?;
    info!(
        "Relevance ranking server listening on http://{}",
        listener.local_addr()?
    );
    info!("Model: {} (loads on first request)", config.ranker.model_id);

    serve(ranker_router(state), listener, shutdown).await
}

/// Run the summarization service backed by the configured T5 checkpoint.
pub async fn run_summarizer(
    config: Arc<AppConfig>,
    port: u16,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let loader = Arc::new(T5Loader::new(
        config.summarizer.clone(),
        config.model_cache_dir(),
    ));
    let service = Arc::new(SummarizeService::new(loader, config.policy()));
    let state = SummarizerState::new(service, port, config.general.max_concurrent_requests)
        .with_body_limit(config.summarizer.max_body_bytes);

    let listener = bind(&config.general, port).await?;
    info!(
        "Summarization server listening on http://{}",
        listener.local_addr()?
    );
    info!("Model: {} (loads on first request)", config.summarizer.model_id);

    serve(summarizer_router(state), listener, shutdown).await
}
