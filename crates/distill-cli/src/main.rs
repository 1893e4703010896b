use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use distill_cli::commands::{self, serve::ServiceKind};

#[derive(Parser)]
#[command(name = "distill")]
#[command(author, version, about = "Local relevance ranking and summarization services")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ~/.config/distill/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relevance ranking service
    Ranker {
        /// Port to listen on
        port: Option<u16>,
    },
    /// Run the summarization service
    Summarizer {
        /// Port to listen on
        port: Option<u16>,
    },
    /// Check both services
    Status {
        /// Print the health reports as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rank documents against a query using a running ranking service
    Rank {
        #[arg(short, long)]
        query: String,
        #[arg(required = true)]
        documents: Vec<String>,
        /// Port of the ranking service
        #[arg(long)]
        port: Option<u16>,
    },
    /// Summarize texts using a running summarization service
    Summarize {
        #[arg(required = true)]
        texts: Vec<String>,
        /// Maximum summary length in tokens
        #[arg(long, default_value_t = 80)]
        max_length: usize,
        /// Minimum summary length in tokens
        #[arg(long, default_value_t = 20)]
        min_length: usize,
        /// Port of the summarization service
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = distill_cli::load_config(cli.config.as_deref())?;
    distill_cli::init_tracing(&config.general.log_level);

    match cli.command {
        Commands::Ranker { port } => commands::serve::run(ServiceKind::Ranker, config, port).await,
        Commands::Summarizer { port } => {
            commands::serve::run(ServiceKind::Summarizer, config, port).await
        }
        Commands::Status { json } => commands::status::run(&config, json).await,
        Commands::Rank {
            query,
            documents,
            port,
        } => commands::rank::run(&config, port, &query, documents).await,
        Commands::Summarize {
            texts,
            max_length,
            min_length,
            port,
        } => commands::summarize::run(&config, port, texts, max_length, min_length).await,
    }
}
