//! HTTP client for the ranking and summarization services.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::protocol::{routes, ErrorBody, HealthStatus};
use crate::rank::{RankRequest, RankResponse};
use crate::summarize::{SummarizeRequest, SummarizeResponse};
use crate::{Error, Result};

const HEALTH_TIMEOUT_SECS: u64 = 5;
const INFERENCE_TIMEOUT_SECS: u64 = 120;

/// Outcome of a health probe. Never an error: an unreachable service is
/// reported as unhealthy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub healthy: bool,
    #[serde(flatten)]
    pub status: Option<HealthStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthCheck {
    fn unhealthy(error: impl ToString) -> Self {
        Self {
            healthy: false,
            status: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct ServiceClient {
    client: Client,
    base_url: String,
}

impl ServiceClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Client for a service on this machine
    pub fn local(port: u16) -> Self {
        Self::new(&format!("http://127.0.0.1:{}", port))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> HealthCheck {
        let response = match self
            .client
            .get(self.url(routes::HEALTH))
            .timeout(Duration::from_secs(HEALTH_TIMEOUT_SECS))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return HealthCheck::unhealthy("Service timeout"),
            Err(e) if e.is_connect() => return HealthCheck::unhealthy("Service not running"),
            Err(e) => return HealthCheck::unhealthy(e),
        };

        if !response.status().is_success() {
            return HealthCheck::unhealthy(format!("HTTP {}", response.status().as_u16()));
        }
        match response.json::<HealthStatus>().await {
            Ok(status) => HealthCheck {
                healthy: true,
                status: Some(status),
                error: None,
            },
            Err(e) => HealthCheck::unhealthy(format!("Invalid health response: {}", e)),
        }
    }

    pub async fn rank(&self, query: &str, documents: Vec<String>) -> Result<RankResponse> {
        let request = RankRequest {
            query: query.to_string(),
            documents,
        };
        self.post(routes::RANK, &request).await
    }

    pub async fn summarize(&self, request: &SummarizeRequest) -> Result<SummarizeResponse> {
        self.post(routes::SUMMARIZE, request).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .client
            .post(self.url(path))
            .timeout(Duration::from_secs(INFERENCE_TIMEOUT_SECS))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or_else(|_| {
                    status
                        .canonical_reason()
                        .unwrap_or("Unexpected response")
                        .to_string()
                });
            return Err(Error::Service {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::net::TcpListener;
    use tokio::sync::watch;

    use crate::policy::ClampPolicy;
    use crate::rank::{CrossEncoder, RankService};
    use crate::server::{ranker_router, serve, RankerState};
    use crate::test_support::{FakeCrossEncoder, FakeLoader};

    async fn start_ranker() -> (ServiceClient, watch::Sender<bool>) {
        let model = FakeCrossEncoder::new() as Arc<dyn CrossEncoder>;
        let loader = FakeLoader::new("fake/cross-encoder", model);
        let service = Arc::new(RankService::new(loader, ClampPolicy::default()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let router = ranker_router(RankerState::new(service, port, 1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(serve(router, listener, shutdown_rx));
        (ServiceClient::local(port), shutdown_tx)
    }

    #[tokio::test]
    async fn test_health_of_running_service() {
        let (client, _shutdown) = start_ranker().await;
        let health = client.health().await;
        assert!(health.healthy);
        let status = health.status.unwrap();
        assert_eq!(status.model, "fake/cross-encoder");
        assert!(!status.model_loaded);
    }

    #[tokio::test]
    async fn test_health_of_missing_service() {
        // Bind then drop to get a port with nothing behind it
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let health = ServiceClient::local(port).health().await;
        assert!(!health.healthy);
        assert!(health.status.is_none());
        assert!(health.error.is_some());
    }

    #[tokio::test]
    async fn test_rank_and_service_errors() {
        let (client, _shutdown) = start_ranker().await;

        let response = client
            .rank(
                "rust async",
                vec!["gardening tips".to_string(), "async rust runtimes".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(response.count, 2);
        assert_eq!(response.rankings[0].index, 1);

        let err = client.rank("", vec!["doc".to_string()]).await.unwrap_err();
        match err {
            Error::Service { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "query and documents required");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_base_url_is_normalized() {
        assert_eq!(ServiceClient::new("http://host:8020/").base_url(), "http://host:8020");
        assert_eq!(ServiceClient::local(8021).base_url(), "http://127.0.0.1:8021");
    }
}
