use std::path::{Path, PathBuf};

use hf_hub::api::sync::{Api, ApiBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::Result;

/// Local paths of the files a model needs
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub config: PathBuf,
    pub tokenizer: PathBuf,
    pub weights: PathBuf,
}

impl ModelFiles {
    pub fn read_config<T: DeserializeOwned>(&self) -> Result<T> {
        let content = std::fs::read_to_string(&self.config)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// Download (or reuse from cache) the config, tokenizer and safetensors weights.
pub fn fetch(model_id: &str, cache_dir: Option<&Path>) -> Result<ModelFiles> {
    let api = match cache_dir {
        Some(dir) => ApiBuilder::new().with_cache_dir(dir.to_path_buf()).build()?,
        None => Api::new()?,
    };
    let repo = api.model(model_id.to_string());

    let files = ModelFiles {
        config: repo.get("config.json")?,
        tokenizer: repo.get("tokenizer.json")?,
        weights: repo.get("model.safetensors")?,
    };
    debug!("Model files for {}: {:?}", model_id, files);
    Ok(files)
}
