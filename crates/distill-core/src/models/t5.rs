//! T5 summarization with greedy decoding.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::t5::{Config as T5Config, T5ForConditionalGeneration};
use tokenizers::Tokenizer;
use tracing::debug;

use super::hub;
use crate::config::SummarizerConfig;
use crate::engine::ModelLoader;
use crate::summarize::{GenerationParams, Summarizer};
use crate::{Error, Result};

struct T5Model {
    model: Mutex<T5ForConditionalGeneration>,
    config: T5Config,
    tokenizer: Tokenizer,
    device: Device,
    prefix: String,
    max_input_tokens: usize,
    no_repeat_ngram_size: usize,
}

impl T5Model {
    fn load(config: &SummarizerConfig, cache_dir: Option<&std::path::Path>) -> Result<Self> {
        let files = hub::fetch(&config.model_id, cache_dir)?;
        let t5_config: T5Config = files.read_config()?;
        let tokenizer = Tokenizer::from_file(&files.tokenizer).map_err(Error::tokenizer)?;

        let device = Device::Cpu;
        // SAFETY: the weights file is owned by the model cache and not modified while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[files.weights.clone()], DType::F32, &device)?
        };
        let model = T5ForConditionalGeneration::load(vb, &t5_config)?;

        Ok(Self {
            model: Mutex::new(model),
            config: t5_config,
            tokenizer,
            device,
            prefix: config.prefix.clone(),
            max_input_tokens: config.max_input_tokens.max(1),
            no_repeat_ngram_size: config.no_repeat_ngram_size,
        })
    }

    fn encode_input(&self, text: &str) -> Result<Vec<u32>> {
        let input = format!("{}{}", self.prefix, text);
        let encoding = self
            .tokenizer
            .encode(input, true)
            .map_err(Error::tokenizer)?;
        let mut ids = encoding.get_ids().to_vec();
        if ids.len() > self.max_input_tokens {
            ids.truncate(self.max_input_tokens - 1);
            ids.push(self.config.eos_token_id as u32);
        }
        Ok(ids)
    }

    fn generate(&self, text: &str, params: GenerationParams) -> Result<String> {
        let ids = self.encode_input(text)?;
        let input_ids = Tensor::new(ids.as_slice(), &self.device)?.unsqueeze(0)?;

        let mut model = self
            .model
            .lock()
            .map_err(|_| Error::Inference("summarization model lock poisoned".to_string()))?;
        model.clear_kv_cache();
        let output = self.decode_greedy(&mut model, &input_ids, params);
        model.clear_kv_cache();
        drop(model);

        let output = output?;
        debug!("Generated {} tokens from {} input tokens", output.len(), ids.len());
        self.tokenizer
            .decode(&output, true)
            .map_err(Error::tokenizer)
    }

    /// Returns generated token ids, without the decoder start token.
    fn decode_greedy(
        &self,
        model: &mut T5ForConditionalGeneration,
        input_ids: &Tensor,
        params: GenerationParams,
    ) -> Result<Vec<u32>> {
        let encoder_output = model.encode(input_ids)?;
        let start = self
            .config
            .decoder_start_token_id
            .unwrap_or(self.config.pad_token_id) as u32;
        let eos = self.config.eos_token_id;

        let mut tokens: Vec<u32> = vec![start];
        // max_length counts the decoder start token
        while tokens.len() < params.max_length {
            let decoder_ids = if tokens.len() == 1 || !self.config.use_cache {
                Tensor::new(tokens.as_slice(), &self.device)?.unsqueeze(0)?
            } else {
                let last = tokens[tokens.len() - 1];
                Tensor::new(&[last], &self.device)?.unsqueeze(0)?
            };

            let logits = model.decode(&decoder_ids, &encoder_output)?.squeeze(0)?;
            let mut logits: Vec<f32> = logits.to_dtype(DType::F32)?.to_vec1()?;

            mask_logits(
                &mut logits,
                &tokens,
                eos,
                params.min_length,
                self.no_repeat_ngram_size,
            );

            let next = argmax(&logits)
                .ok_or_else(|| Error::Inference("decoder produced no logits".to_string()))?;
            if next as usize == eos {
                break;
            }
            tokens.push(next);
        }

        tokens.remove(0);
        Ok(tokens)
    }
}

/// Ban EOS until `tokens` (decoder start included, like `max_length`) reaches
/// `min_length`, and ban tokens that would repeat an n-gram.
fn mask_logits(
    logits: &mut [f32],
    tokens: &[u32],
    eos: usize,
    min_length: usize,
    no_repeat_ngram_size: usize,
) {
    if tokens.len() < min_length {
        if let Some(logit) = logits.get_mut(eos) {
            *logit = f32::NEG_INFINITY;
        }
    }
    let generated = tokens.get(1..).unwrap_or_default();
    for banned in banned_ngram_tokens(generated, no_repeat_ngram_size) {
        if let Some(logit) = logits.get_mut(banned as usize) {
            *logit = f32::NEG_INFINITY;
        }
    }
}

fn argmax(logits: &[f32]) -> Option<u32> {
    logits
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(idx, _)| idx as u32)
}

/// Tokens that would complete an n-gram already present in `generated`.
fn banned_ngram_tokens(generated: &[u32], n: usize) -> Vec<u32> {
    if n == 0 || generated.len() + 1 < n {
        return Vec::new();
    }
    let prefix = &generated[generated.len() + 1 - n..];
    generated
        .windows(n)
        .filter(|window| &window[..n - 1] == prefix)
        .map(|window| window[n - 1])
        .collect()
}

/// Summarizer backed by candle on the CPU
pub struct T5Summarizer {
    inner: Arc<T5Model>,
}

#[async_trait::async_trait]
impl Summarizer for T5Summarizer {
    async fn summarize(&self, text: &str, params: GenerationParams) -> Result<String> {
        let inner = self.inner.clone();
        let text = text.to_string();
        tokio::task::spawn_blocking(move || inner.generate(&text, params))
            .await
            .map_err(|e| Error::Inference(format!("Task join error: {}", e)))?
    }
}

/// Loads the configured T5 checkpoint from the Hugging Face hub
pub struct T5Loader {
    config: SummarizerConfig,
    cache_dir: Option<PathBuf>,
}

impl T5Loader {
    pub fn new(config: SummarizerConfig, cache_dir: Option<PathBuf>) -> Self {
        Self { config, cache_dir }
    }
}

impl ModelLoader<dyn Summarizer> for T5Loader {
    fn model_name(&self) -> &str {
        &self.config.model_id
    }

    fn load(&self) -> Result<Arc<dyn Summarizer>> {
        let model = T5Model::load(&self.config, self.cache_dir.as_deref())?;
        let summarizer: Arc<dyn Summarizer> = Arc::new(T5Summarizer {
            inner: Arc::new(model),
        });
        Ok(summarizer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.1, 2.0, -1.0]), Some(1));
        assert_eq!(argmax(&[f32::NEG_INFINITY, -5.0]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_banned_ngram_tokens() {
        // "a b c a b" -> completing "a b" again with "c" would repeat a trigram
        assert_eq!(banned_ngram_tokens(&[1, 2, 3, 1, 2], 3), vec![3]);
        assert!(banned_ngram_tokens(&[1, 2, 3, 4], 3).is_empty());
        assert!(banned_ngram_tokens(&[1], 3).is_empty());
        assert!(banned_ngram_tokens(&[1, 2, 1, 2], 0).is_empty());
        // unigram blocking bans every token seen so far
        let mut banned = banned_ngram_tokens(&[5, 6, 5], 1);
        banned.sort_unstable();
        assert_eq!(banned, vec![5, 5, 6]);
    }

    #[test]
    fn test_min_length_counts_decoder_start() {
        let eos = 1;
        // start token + 2 generated = length 3
        let mut logits = vec![0.0, 5.0, 1.0, 2.0];
        mask_logits(&mut logits, &[0, 2, 3], eos, 4, 0);
        assert_eq!(logits[eos], f32::NEG_INFINITY);
        assert_eq!(argmax(&logits), Some(3));

        let mut logits = vec![0.0, 5.0, 1.0, 2.0];
        mask_logits(&mut logits, &[0, 2, 3, 2], eos, 4, 0);
        assert_eq!(argmax(&logits), Some(eos as u32));
    }

    #[test]
    fn test_mask_logits_bans_repeated_ngrams() {
        // generated "2 3 2": emitting 3 would repeat the bigram "2 3"
        let mut logits = vec![0.0, 0.0, 1.0, 9.0];
        mask_logits(&mut logits, &[0, 2, 3, 2], 1, 0, 2);
        assert_eq!(logits[3], f32::NEG_INFINITY);
        assert_eq!(argmax(&logits), Some(2));
    }
}
