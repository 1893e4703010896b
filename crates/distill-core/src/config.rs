use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::policy::ClampPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub ranker: RankerConfig,
    #[serde(default)]
    pub summarizer: SummarizerConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level used when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Interface the services bind to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Directory for downloaded model weights (defaults to the Hugging Face cache)
    #[serde(default)]
    pub model_cache_dir: Option<PathBuf>,
    /// Inference requests processed at once per service
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            bind_address: default_bind_address(),
            model_cache_dir: None,
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankerConfig {
    /// Listening port
    #[serde(default = "default_ranker_port")]
    pub port: u16,
    /// Hugging Face repository of the cross-encoder
    #[serde(default = "default_ranker_model")]
    pub model_id: String,
    /// Maximum tokens per (query, document) pair
    #[serde(default = "default_max_seq_len")]
    pub max_seq_len: usize,
    /// Pairs scored per forward pass
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            port: default_ranker_port(),
            model_id: default_ranker_model(),
            max_seq_len: default_max_seq_len(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// Listening port
    #[serde(default = "default_summarizer_port")]
    pub port: u16,
    /// Hugging Face repository of the summarization model
    #[serde(default = "default_summarizer_model")]
    pub model_id: String,
    /// Task prefix prepended to every input
    #[serde(default = "default_summarize_prefix")]
    pub prefix: String,
    /// Encoder input limit in tokens
    #[serde(default = "default_max_input_tokens")]
    pub max_input_tokens: usize,
    /// Block repeated n-grams of this size while decoding (0 = off)
    #[serde(default = "default_no_repeat_ngram_size")]
    pub no_repeat_ngram_size: usize,
    /// Optional request body cap. Unset by default: the summarizer has never
    /// enforced one, unlike the ranker.
    #[serde(default)]
    pub max_body_bytes: Option<u64>,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            port: default_summarizer_port(),
            model_id: default_summarizer_model(),
            prefix: default_summarize_prefix(),
            max_input_tokens: default_max_input_tokens(),
            no_repeat_ngram_size: default_no_repeat_ngram_size(),
            max_body_bytes: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Ranking request body cap in bytes
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
    /// Documents kept per ranking request
    #[serde(default = "default_max_documents")]
    pub max_documents: usize,
    /// Characters kept per document
    #[serde(default = "default_max_doc_chars")]
    pub max_doc_chars: usize,
    /// Characters of a text passed to the summarizer
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
    /// Texts shorter than this (after trimming) are returned as-is
    #[serde(default = "default_min_summarize_chars")]
    pub min_summarize_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
            max_documents: default_max_documents(),
            max_doc_chars: default_max_doc_chars(),
            max_text_chars: default_max_text_chars(),
            min_summarize_chars: default_min_summarize_chars(),
        }
    }
}

impl LimitsConfig {
    pub fn policy(&self) -> ClampPolicy {
        ClampPolicy {
            max_body_bytes: self.max_body_bytes,
            max_documents: self.max_documents,
            max_doc_chars: self.max_doc_chars,
            max_text_chars: self.max_text_chars,
            min_summarize_chars: self.min_summarize_chars,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_max_concurrent_requests() -> usize {
    1
}

fn default_ranker_port() -> u16 {
    8021
}

fn default_ranker_model() -> String {
    "cross-encoder/ms-marco-MiniLM-L-6-v2".to_string()
}

fn default_max_seq_len() -> usize {
    512
}

fn default_batch_size() -> usize {
    32
}

fn default_summarizer_port() -> u16 {
    8020
}

fn default_summarizer_model() -> String {
    "Falconsai/text_summarization".to_string()
}

fn default_summarize_prefix() -> String {
    "summarize: ".to_string()
}

fn default_max_input_tokens() -> usize {
    512
}

fn default_no_repeat_ngram_size() -> usize {
    3
}

fn default_max_body_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_max_documents() -> usize {
    500
}

fn default_max_doc_chars() -> usize {
    2000
}

fn default_max_text_chars() -> usize {
    2000
}

fn default_min_summarize_chars() -> usize {
    50
}

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if path_str == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

impl AppConfig {
    /// Load configuration from the default location or return defaults
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit file; a missing file yields defaults
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> crate::Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Get the configuration file path
    /// Always uses ~/.config/distill/config.toml on all platforms
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("distill")
            .join("config.toml")
    }

    /// Model cache directory with tilde expansion
    pub fn model_cache_dir(&self) -> Option<PathBuf> {
        self.general.model_cache_dir.as_deref().map(expand_tilde)
    }

    pub fn policy(&self) -> ClampPolicy {
        self.limits.policy()
    }

    fn validate(&self) -> crate::Result<()> {
        if self.general.max_concurrent_requests == 0 {
            return Err(crate::Error::Config(
                "general.max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.ranker.batch_size == 0 {
            return Err(crate::Error::Config(
                "ranker.batch_size must be at least 1".to_string(),
            ));
        }
        if self.limits.max_documents == 0 {
            return Err(crate::Error::Config(
                "limits.max_documents must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_service_contract() {
        let config = AppConfig::default();
        assert_eq!(config.ranker.port, 8021);
        assert_eq!(config.summarizer.port, 8020);
        assert_eq!(config.general.bind_address, "0.0.0.0");
        assert_eq!(config.limits.max_body_bytes, 10 * 1024 * 1024);
        assert_eq!(config.limits.max_documents, 500);
        assert_eq!(config.limits.max_doc_chars, 2000);
        assert_eq!(config.limits.max_text_chars, 2000);
        assert!(config.summarizer.max_body_bytes.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [ranker]
            port = 9000

            [limits]
            max_documents = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.ranker.port, 9000);
        assert_eq!(config.ranker.model_id, "cross-encoder/ms-marco-MiniLM-L-6-v2");
        assert_eq!(config.limits.max_documents, 10);
        assert_eq!(config.limits.max_doc_chars, 2000);
        assert_eq!(config.summarizer.port, 8020);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = AppConfig::from_toml("[general]\nmax_concurrent_requests = 0\n").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));

        let err = AppConfig::from_toml("[ranker]\nport = \"nope\"\n").unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("distill-config-does-not-exist.toml");
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.ranker.port, 8021);
    }

    #[test]
    fn test_expand_tilde() {
        let plain = expand_tilde(Path::new("/var/cache/models"));
        assert_eq!(plain, PathBuf::from("/var/cache/models"));

        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde(Path::new("~/models")), home.join("models"));
        }
    }
}
