//! Shared plumbing for the `distill`, `relevance-service` and
//! `summarizer-service` binaries.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use distill_core::AppConfig;

pub mod commands;

/// Load the config file named on the command line, or the default one.
pub fn load_config(path: Option<&Path>) -> Result<Arc<AppConfig>> {
    let config = match path {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    Ok(Arc::new(config))
}

/// `RUST_LOG` wins over the configured level.
pub fn init_tracing(default_level: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
