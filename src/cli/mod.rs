//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "gemsearch",
    version,
    about = "Hybrid vector + keyword product search for jewellery catalogs",
    long_about = "Gemsearch ranks catalog items against a text query by combining approximate \
                  nearest-neighbor search over precomputed embeddings with keyword-overlap \
                  scoring, with an optional LLM reranking pass."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/gemsearch/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search the catalog with a text query
    Search {
        /// Query text
        query: String,

        /// Maximum number of results to return
        #[arg(short = 'k', long, default_value = "5")]
        top_k: usize,

        /// Apply the LLM reranking pass to the results
        #[arg(long)]
        rerank: bool,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Embed all catalog items and write the vector index file
    BuildIndex,

    /// Show catalog and index status
    Status,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
