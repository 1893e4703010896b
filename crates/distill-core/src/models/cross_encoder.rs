//! BERT cross-encoder: joint (query, document) encoding, pooled [CLS] state,
//! single-logit classification head. The raw logit is the relevance score.

use std::path::PathBuf;
use std::sync::Arc;

use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::{linear, Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use serde::Deserialize;
use tokenizers::{
    Encoding, PaddingParams, PaddingStrategy, Tokenizer, TruncationParams, TruncationStrategy,
};
use tracing::debug;

use super::hub;
use crate::config::RankerConfig;
use crate::engine::ModelLoader;
use crate::rank::CrossEncoder;
use crate::{Error, Result};

#[derive(Deserialize)]
struct HeadConfig {
    hidden_size: usize,
}

struct CrossEncoderModel {
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
    batch_size: usize,
}

impl CrossEncoderModel {
    fn load(config: &RankerConfig, cache_dir: Option<&std::path::Path>) -> Result<Self> {
        let files = hub::fetch(&config.model_id, cache_dir)?;
        let bert_config: BertConfig = files.read_config()?;
        let head: HeadConfig = files.read_config()?;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer).map_err(Error::tokenizer)?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: config.max_seq_len,
                strategy: TruncationStrategy::LongestFirst,
                ..Default::default()
            }))
            .map_err(Error::tokenizer)?;

        let device = Device::Cpu;
        // SAFETY: the weights file is owned by the model cache and not modified while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights.clone()], DType::F32, &device)?
        };
        let bert = BertModel::load(vb.pp("bert"), &bert_config)?;
        let pooler = linear(head.hidden_size, head.hidden_size, vb.pp("bert.pooler.dense"))?;
        let classifier = linear(head.hidden_size, 1, vb.pp("classifier"))?;

        Ok(Self {
            bert,
            pooler,
            classifier,
            tokenizer,
            device,
            batch_size: config.batch_size.max(1),
        })
    }

    fn predict(&self, pairs: &[(String, String)]) -> Result<Vec<f32>> {
        let mut scores = Vec::with_capacity(pairs.len());

        for chunk in pairs.chunks(self.batch_size) {
            let inputs: Vec<(&str, &str)> = chunk
                .iter()
                .map(|(query, doc)| (query.as_str(), doc.as_str()))
                .collect();
            let encodings = self
                .tokenizer
                .encode_batch(inputs, true)
                .map_err(Error::tokenizer)?;

            let input_ids = batch_tensor(&encodings, Encoding::get_ids, &self.device)?;
            let type_ids = batch_tensor(&encodings, Encoding::get_type_ids, &self.device)?;
            let mask = batch_tensor(&encodings, Encoding::get_attention_mask, &self.device)?;

            let hidden = self.bert.forward(&input_ids, &type_ids, Some(&mask))?;
            let cls = hidden.i((.., 0))?;
            let pooled = self.pooler.forward(&cls)?.tanh()?;
            let logits = self.classifier.forward(&pooled)?;
            scores.extend(logits.squeeze(1)?.to_vec1::<f32>()?);
        }

        debug!("Scored {} pairs", scores.len());
        Ok(scores)
    }
}

fn batch_tensor(
    encodings: &[Encoding],
    field: fn(&Encoding) -> &[u32],
    device: &Device,
) -> Result<Tensor> {
    let rows = encodings.len();
    let cols = encodings.first().map(|e| field(e).len()).unwrap_or(0);
    let flat: Vec<u32> = encodings
        .iter()
        .flat_map(|e| field(e).iter().copied())
        .collect();
    Ok(Tensor::from_vec(flat, (rows, cols), device)?)
}

/// Cross-encoder backed by candle on the CPU
pub struct CandleCrossEncoder {
    inner: Arc<CrossEncoderModel>,
}

#[async_trait::async_trait]
impl CrossEncoder for CandleCrossEncoder {
    async fn predict(&self, pairs: Vec<(String, String)>) -> Result<Vec<f32>> {
        let inner = self.inner.clone();
        tokio::task::spawn_blocking(move || inner.predict(&pairs))
            .await
            .map_err(|e| Error::Inference(format!("Task join error: {}", e)))?
    }
}

/// Loads the configured cross-encoder from the Hugging Face hub
pub struct CrossEncoderLoader {
    config: RankerConfig,
    cache_dir: Option<PathBuf>,
}

impl CrossEncoderLoader {
    pub fn new(config: RankerConfig, cache_dir: Option<PathBuf>) -> Self {
        Self { config, cache_dir }
    }
}

impl ModelLoader<dyn CrossEncoder> for CrossEncoderLoader {
    fn model_name(&self) -> &str {
        &self.config.model_id
    }

    fn load(&self) -> Result<Arc<dyn CrossEncoder>> {
        let model = CrossEncoderModel::load(&self.config, self.cache_dir.as_deref())?;
        let encoder: Arc<dyn CrossEncoder> = Arc::new(CandleCrossEncoder {
            inner: Arc::new(model),
        });
        Ok(encoder)
    }
}
