//! Command-line argument parsing for local-rag
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// local-rag - answer questions from a PDF's page text with a local model
#[derive(Parser, Debug)]
#[command(name = "local-rag")]
#[command(version)]
#[command(about = "Retrieval-augmented answers over page-indexed document text", long_about = None)]
pub struct Args {
    /// Configuration file path (default: ~/.local-rag/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity: -v (debug), -vv (trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chunk and embed page text into an embeddings dataset
    Index(IndexArgs),

    /// Retrieve the most relevant sources for a query
    Search {
        /// Query text
        query: String,
        /// Number of sources
        #[arg(short, long)]
        k: Option<usize>,
        /// Print the raw JSON result
        #[arg(long)]
        json: bool,
    },

    /// Answer a query with retrieved context and the generation model
    Ask {
        /// Query text
        query: String,
        /// Number of sources
        #[arg(short, long)]
        k: Option<usize>,
        /// Print the rendered prompt and sources as well
        #[arg(long)]
        show_prompt: bool,
    },

    /// Serve the query endpoint over HTTP
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },

    /// Display current configuration
    Config,
}

#[derive(ClapArgs, Debug)]
pub struct IndexArgs {
    /// Page text dataset (pages-text.json); defaults to the configured path
    #[arg(long)]
    pub pages: Option<PathBuf>,

    /// Output embeddings dataset; defaults to the configured path
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Where the selected pages are written; defaults to the configured path
    #[arg(long)]
    pub pages_output: Option<PathBuf>,

    /// Overlapping tokens between consecutive chunks
    #[arg(long)]
    pub overlap: Option<usize>,

    /// Tokens per chunk
    #[arg(long)]
    pub tokens_per_chunk: Option<usize>,

    /// Shift page numbers by this amount before filtering
    #[arg(long, allow_negative_numbers = true, default_value_t = 0)]
    pub page_offset: i64,

    /// First page to keep
    #[arg(long, default_value_t = 1)]
    pub first_page: u32,

    /// Last page to keep (default: page count)
    #[arg(long)]
    pub last_page: Option<u32>,

    /// Dehyphenate and normalize page text first
    #[arg(long)]
    pub clean: bool,

    /// Overwrite an existing output file
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search() {
        let args = Args::parse_from(["local-rag", "search", "what is dataplex?", "-k", "3"]);
        match args.command {
            Commands::Search { query, k, json } => {
                assert_eq!(query, "what is dataplex?");
                assert_eq!(k, Some(3));
                assert!(!json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_index_with_negative_offset() {
        let args = Args::parse_from([
            "local-rag", "index", "--pages", "p.json", "--page-offset", "-40", "--last-page", "305",
            "--force", "-v",
        ]);
        assert_eq!(args.verbose, 1);
        match args.command {
            Commands::Index(index) => {
                assert_eq!(index.page_offset, -40);
                assert_eq!(index.pages_output, None);
                assert_eq!(index.first_page, 1);
                assert_eq!(index.last_page, Some(305));
                assert!(index.force);
                assert!(!index.clean);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_index_pages_output() {
        let args = Args::parse_from(["local-rag", "index", "--pages-output", "selected.json", "--clean"]);
        match args.command {
            Commands::Index(index) => {
                assert_eq!(index.pages_output, Some(PathBuf::from("selected.json")));
                assert!(index.clean);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_negative_k_rejected() {
        assert!(Args::try_parse_from(["local-rag", "search", "q", "-k", "-1"]).is_err());
    }
}
