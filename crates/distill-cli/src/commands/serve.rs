use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::info;

use distill_core::{server, AppConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Ranker,
    Summarizer,
}

impl ServiceKind {
    pub fn label(self) -> &'static str {
        match self {
            ServiceKind::Ranker => "Relevance ranking server",
            ServiceKind::Summarizer => "Summarization server",
        }
    }

    /// The command-line port wins over the configured one.
    pub fn resolve_port(self, config: &AppConfig, port: Option<u16>) -> u16 {
        port.unwrap_or(match self {
            ServiceKind::Ranker => config.ranker.port,
            ServiceKind::Summarizer => config.summarizer.port,
        })
    }

    fn model_id(self, config: &AppConfig) -> &str {
        match self {
            ServiceKind::Ranker => &config.ranker.model_id,
            ServiceKind::Summarizer => &config.summarizer.model_id,
        }
    }
}

/// Run a service in the foreground until Ctrl+C.
pub async fn run(kind: ServiceKind, config: Arc<AppConfig>, port: Option<u16>) -> Result<()> {
    let port = kind.resolve_port(&config, port);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        let _ = shutdown_tx.send(true);
    });

    println!("Starting {} on port {}", kind.label(), port);
    println!("  Model: {} (loads on first request)", kind.model_id(&config));
    println!("  Press Ctrl+C to stop.");

    match kind {
        ServiceKind::Ranker => server::run_ranker(config, port, shutdown_rx).await?,
        ServiceKind::Summarizer => server::run_summarizer(config, port, shutdown_rx).await?,
    }

    println!("{} stopped.", kind.label());
    Ok(())
}
