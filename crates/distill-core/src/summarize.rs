//! Abstractive summarization with per-item fallback.
//!
//! Every input text goes through a small state machine:
//! too short -> returned unchanged without touching the model;
//! normal -> truncated and summarized;
//! summarization fails -> the original, untruncated text is returned.
//! One item failing never fails the batch.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine::{EngineState, InferenceEngine, ModelLoader};
use crate::policy::ClampPolicy;
use crate::validate;
use crate::Result;

/// Decoding bounds in tokens. Decoding is always deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationParams {
    pub max_length: usize,
    pub min_length: usize,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_length: default_max_length(),
            min_length: default_min_length(),
        }
    }
}

#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str, params: GenerationParams) -> Result<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeRequest {
    /// `null` entries are treated like empty strings
    #[serde(default)]
    pub texts: Vec<Option<String>>,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default = "default_min_length")]
    pub min_length: usize,
}

impl SummarizeRequest {
    pub fn new(texts: Vec<String>) -> Self {
        Self {
            texts: texts.into_iter().map(Some).collect(),
            max_length: default_max_length(),
            min_length: default_min_length(),
        }
    }

    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            max_length: self.max_length,
            min_length: self.min_length,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub summaries: Vec<String>,
    pub count: usize,
    pub model: String,
}

fn default_max_length() -> usize {
    80
}

fn default_min_length() -> usize {
    20
}

/// What to do with a single input text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemPlan<'a> {
    /// Too short (or absent): echo it back
    Skip,
    /// Summarize this truncated input
    Invoke(&'a str),
}

/// How a single output was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Skipped,
    Summarized,
    Fallback,
}

pub fn plan_item<'a>(text: Option<&'a str>, policy: &ClampPolicy) -> ItemPlan<'a> {
    match text {
        Some(text) if !policy.is_too_short(text) => ItemPlan::Invoke(policy.clamp_text(text)),
        _ => ItemPlan::Skip,
    }
}

/// Produce the output for one text.
pub async fn summarize_item(
    model: &dyn Summarizer,
    text: Option<&str>,
    params: GenerationParams,
    policy: &ClampPolicy,
) -> (String, ItemOutcome) {
    let original = text.unwrap_or_default();
    match plan_item(text, policy) {
        ItemPlan::Skip => (original.to_string(), ItemOutcome::Skipped),
        ItemPlan::Invoke(input) => match model.summarize(input, params).await {
            Ok(summary) => (summary, ItemOutcome::Summarized),
            Err(e) => {
                warn!(
                    "Summarization error for text ({} chars): {}",
                    original.chars().count(),
                    e
                );
                (original.to_string(), ItemOutcome::Fallback)
            }
        },
    }
}

/// Summarize texts one after another. Output order and length match the input.
pub async fn summarize_texts(
    model: &dyn Summarizer,
    texts: &[Option<String>],
    params: GenerationParams,
    policy: &ClampPolicy,
) -> Vec<String> {
    let mut summaries = Vec::with_capacity(texts.len());
    let (mut skipped, mut summarized, mut fallback) = (0usize, 0usize, 0usize);

    for text in texts {
        let (summary, outcome) = summarize_item(model, text.as_deref(), params, policy).await;
        match outcome {
            ItemOutcome::Skipped => skipped += 1,
            ItemOutcome::Summarized => summarized += 1,
            ItemOutcome::Fallback => fallback += 1,
        }
        summaries.push(summary);
    }

    debug!(
        summarized,
        skipped,
        fallback,
        "Summarization batch finished"
    );
    summaries
}

/// Summarization service: validation, lazy model loading and the per-item loop.
pub struct SummarizeService {
    engine: InferenceEngine<dyn Summarizer>,
    policy: ClampPolicy,
}

impl SummarizeService {
    pub fn new(loader: Arc<dyn ModelLoader<dyn Summarizer>>, policy: ClampPolicy) -> Self {
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

    pub async fn summarize(&self, request: SummarizeRequest) -> Result<SummarizeResponse> {
        validate::validate_summarize(&request)?;
        let model = self.engine.ensure_ready().await?;

        let summaries =
            summarize_texts(model.as_ref(), &request.texts, request.params(), &self.policy).await;

        Ok(SummarizeResponse {
            count: summaries.len(),
            summaries,
            model: self.engine.model_name().to_string(),
        })
    }
}
