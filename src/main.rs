use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use insight_rag::commands::{ingest, query, show_config, show_status, write_config};
use insight_rag::config::{Config, get_config_dir};
use insight_rag::logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "insight-rag")]
#[command(about = "Retrieval-augmented question answering over business documents")]
#[command(version)]
struct Cli {
    /// Base directory holding config.toml, the index and the query log
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or rewrite the configuration file
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Index .txt documents that are not indexed yet
    Ingest {
        /// Directory to read; defaults to the configured documents directory
        dir: Option<PathBuf>,
    },
    /// Retrieve the chunks most relevant to a question
    Query {
        text: String,
        /// Number of chunks to retrieve
        #[arg(long)]
        top_k: Option<usize>,
        /// Compose an answer from the retrieved chunks
        #[arg(long)]
        answer: bool,
        /// Compose a JSON answer with insights, recommendations and sources
        #[arg(long, conflicts_with = "answer")]
        structured: bool,
    },
    /// Show index and model server status
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let base_dir = match cli.base_dir {
        Some(dir) => dir,
        None => get_config_dir()?,
    };
    let config = Config::load(&base_dir)
        .with_context(|| format!("Failed to load configuration from {}", base_dir.display()))?;

    logging::init(&config.logging.level);

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config)?;
            } else {
                write_config(&config)?;
            }
        }
        Commands::Ingest { dir } => {
            ingest(&config, dir)?;
        }
        Commands::Query {
            text,
            top_k,
            answer,
            structured,
        } => {
            query(&config, &text, top_k, answer, structured)?;
        }
        Commands::Status => {
            show_status(&config)?;
        }
    }

    Ok(())
}
