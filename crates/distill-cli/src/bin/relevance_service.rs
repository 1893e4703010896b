//! Relevance ranking service: `relevance-service [PORT]`

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use distill_cli::commands::serve::{self, ServiceKind};

#[derive(Parser)]
#[command(name = "relevance-service")]
#[command(version, about = "Cross-encoder relevance ranking over HTTP")]
struct Args {
    /// Port to listen on (defaults to the configured ranker port, 8021)
    port: Option<u16>,

    /// Config file (defaults to ~/.config/distill/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = distill_cli::load_config(args.config.as_deref())?;
    distill_cli::init_tracing(&config.general.log_level);

    serve::run(ServiceKind::Ranker, config, args.port).await
}
