// RAG (Retrieval-Augmented Generation) core
//
// Components:
// - Search: cosine similarity over the chunk vector matrix, top-k
// - Resolver: ranked rows back to chunk and page text
// - Retriever: embed -> search -> resolve for one query
// - Context Builder: assemble retrieved text for a prompt
// - Pipeline: retrieval plus prompt rendering and generation

pub mod context;
pub mod pipeline;
pub mod resolver;
pub mod retriever;
pub mod search;

// Re-export key types
pub use context::{AssembledContext, ContextBuilder, ContextConfig, ContextSource};
pub use pipeline::{RagAnswer, RagPipeline};
pub use resolver::{RetrievedSource, SourceResolver};
pub use retriever::{RetrievalResult, Retriever, RetrieverOptions};
pub use search::{cosine_similarity, rank_top_k, ScoredIndex, SimilarityIndex, VectorMatrix};
