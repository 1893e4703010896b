//! Fake models and loaders shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::engine::ModelLoader;
use crate::rank::CrossEncoder;
use crate::summarize::{GenerationParams, Summarizer};
use crate::{Error, Result};

pub struct FakeLoader<M: ?Sized> {
    name: String,
    model: Arc<M>,
    loads: AtomicUsize,
    fail_first: usize,
}

impl<M: ?Sized> FakeLoader<M> {
    pub fn new(name: &str, model: Arc<M>) -> Arc<Self> {
        Self::failing_first(name, model, 0)
    }

    pub fn failing_first(name: &str, model: Arc<M>, fail_first: usize) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            model,
            loads: AtomicUsize::new(0),
            fail_first,
        })
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl<M: ?Sized + Send + Sync + 'static> ModelLoader<M> for FakeLoader<M> {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Arc<M>> {
        let attempt = self.loads.fetch_add(1, Ordering::SeqCst);
        if attempt < self.fail_first {
            return Err(Error::ModelLoad("weights not found".to_string()));
        }
        Ok(self.model.clone())
    }
}

/// Scores a pair by how many query words occur in the document.
#[derive(Default)]
pub struct FakeCrossEncoder {
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
    fail: bool,
}

impl FakeCrossEncoder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_documents(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl CrossEncoder for FakeCrossEncoder {
    async fn predict(&self, pairs: Vec<(String, String)>) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Inference("out of memory".to_string()));
        }

        let mut seen = self.seen.lock().unwrap();
        Ok(pairs
            .into_iter()
            .map(|(query, doc)| {
                let doc_lower = doc.to_lowercase();
                let hits = query
                    .to_lowercase()
                    .split_whitespace()
                    .filter(|word| doc_lower.contains(word))
                    .count();
                seen.push(doc);
                hits as f32
            })
            .collect())
    }
}

/// Keeps the first few words; fails on any input containing `FAIL`.
#[derive(Default)]
pub struct FakeSummarizer {
    calls: AtomicUsize,
    inputs: Mutex<Vec<String>>,
    params: Mutex<Vec<GenerationParams>>,
}

impl FakeSummarizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }

    pub fn seen_params(&self) -> Vec<GenerationParams> {
        self.params.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, text: &str, params: GenerationParams) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inputs.lock().unwrap().push(text.to_string());
        self.params.lock().unwrap().push(params);

        if text.contains("FAIL") {
            return Err(Error::Inference("decoder exploded".to_string()));
        }
        Ok(text.split_whitespace().take(8).collect::<Vec<_>>().join(" "))
    }
}

/// A plain-prose text of `words` words.
pub fn article(words: usize) -> String {
    const VOCAB: [&str; 8] = [
        "tumour", "cells", "respond", "to", "targeted", "therapy", "in", "trials",
    ];
    (0..words)
        .map(|i| VOCAB[i % VOCAB.len()])
        .collect::<Vec<_>>()
        .join(" ")
}
