//! Corpus store: page texts and chunk embeddings loaded from JSON datasets.

pub mod store;
pub mod types;

pub use store::{export_json, load_json_list, Corpus, ExportOutcome};
pub use types::{ChunkEmbedding, PageText};
