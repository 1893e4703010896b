//! Relevance ranking: score documents against a query with a cross-encoder.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::{EngineState, InferenceEngine, ModelLoader};
use crate::policy::ClampPolicy;
use crate::validate::{self, ValidRank};
use crate::{Error, Result};

/// Scores (query, document) pairs jointly. Scores are unbounded; higher means
/// more relevant. The output has one score per input pair, in input order.
#[async_trait::async_trait]
pub trait CrossEncoder: Send + Sync {
    async fn predict(&self, pairs: Vec<(String, String)>) -> Result<Vec<f32>>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub documents: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankResult {
    /// Position in the clamped document list
    pub index: usize,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankResponse {
    pub rankings: Vec<RankResult>,
    pub count: usize,
    pub model: String,
}

/// Score every document and order the results by descending score.
///
/// Ties keep no particular order.
pub async fn rank_documents(
    model: &dyn CrossEncoder,
    query: &str,
    documents: &[String],
) -> Result<Vec<RankResult>> {
    let pairs: Vec<(String, String)> = documents
        .iter()
        .map(|doc| (query.to_string(), doc.clone()))
        .collect();
    let expected = pairs.len();

    let scores = model.predict(pairs).await?;
    if scores.len() != expected {
        return Err(Error::Inference(format!(
            "Cross-encoder returned {} scores for {} documents",
            scores.len(),
            expected
        )));
    }

    let mut rankings: Vec<RankResult> = scores
        .into_iter()
        .enumerate()
        .map(|(index, score)| RankResult { index, score })
        .collect();
    rankings.sort_unstable_by(|a, b| b.score.total_cmp(&a.score));

    Ok(rankings)
}

/// Ranking service: validation, lazy model loading and scoring.
pub struct RankService {
    engine: InferenceEngine<dyn CrossEncoder>,
    policy: ClampPolicy,
}

impl RankService {
    pub fn new(loader: Arc<dyn ModelLoader<dyn CrossEncoder>>, policy: ClampPolicy) -> Self {
        Self {
            engine: InferenceEngine::new(loader),
            policy,
        }
    }

    pub fn model_name(&self) -> &str {
        self.engine.model_name()
    }

    pub fn engine_state(&self) -> EngineState {
        self.engine.state()
    }

    pub fn policy(&self) -> &ClampPolicy {
        &self.policy
    }

    pub async fn rank(&self, request: RankRequest) -> Result<RankResponse> {
        let ValidRank { query, documents } = validate::validate_rank(request, &self.policy)?;
        let model = self.engine.ensure_ready().await?;

        debug!("Ranking {} documents", documents.len());
        let rankings = rank_documents(model.as_ref(), &query, &documents).await?;

        Ok(RankResponse {
            count: rankings.len(),
            rankings,
            model: self.engine.model_name().to_string(),
        })
    }
}
