//! local-rag - retrieval-augmented generation over a single document
//!
//! Page text and chunk embeddings are loaded from JSON datasets, queries are
//! embedded with a local sentence-embedding model, chunks are ranked by
//! cosine similarity, and the top sources feed a prompt for a local model.
//!
//! # Architecture
//!
//! - **corpus**: page texts + chunk embeddings, validated on load
//! - **embedding**: `Embedder` trait and the Candle BERT engine
//! - **rag**: similarity search, source resolution, retrieval, pipeline
//! - **preprocessing**: page cleanup, token chunking, indexing
//! - **prompt** / **generation**: template rendering and the Ollama client
//! - **server**: HTTP query endpoint

pub mod errors;

// Re-export commonly used types
pub use errors::{RagError, Result};

pub mod cli;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod generation;
pub mod logging;
pub mod preprocessing;
pub mod prompt;
pub mod rag;
pub mod server;

pub use config::Config;
pub use corpus::{ChunkEmbedding, Corpus, PageText};
pub use embedding::{EmbedOptions, Embedder};
pub use rag::{RetrievalResult, RetrievedSource, Retriever};
