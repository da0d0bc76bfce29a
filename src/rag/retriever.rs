// End-to-end retrieval: validate -> embed -> search -> resolve
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::corpus::Corpus;
use crate::embedding::{EmbedOptions, Embedder};
use crate::errors::{RagError, Result};
use crate::rag::resolver::{RetrievedSource, SourceResolver};
use crate::rag::search::{validate_k, ScoredIndex, SimilarityIndex};

/// Query-time embedding options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrieverOptions {
    pub normalize_query: bool,
    pub batch_size: usize,
}

impl Default for RetrieverOptions {
    fn default() -> Self {
        Self {
            normalize_query: true,
            batch_size: 32,
        }
    }
}

/// Fresh, caller-owned result of one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub query: String,
    pub outputs: Vec<RetrievedSource>,
}

/// Read-only retriever over one corpus.
///
/// Holds no query-scoped state, so `&self` calls are safe to run
/// concurrently from a shared `Arc<Retriever>`.
pub struct Retriever {
    corpus: Corpus,
    index: SimilarityIndex,
    embedder: Arc<dyn Embedder>,
    options: RetrieverOptions,
}

impl Retriever {
    /// Build the vector matrix from `corpus` and take ownership of both
    pub fn new(corpus: Corpus, embedder: Arc<dyn Embedder>) -> Result<Self> {
        Self::with_options(corpus, embedder, RetrieverOptions::default())
    }

    pub fn with_options(
        corpus: Corpus,
        embedder: Arc<dyn Embedder>,
        options: RetrieverOptions,
    ) -> Result<Self> {
        if embedder.dimension() != corpus.dimension() {
            return Err(RagError::DataFormat(format!(
                "model '{}' produces {}-dim vectors but the corpus holds {}-dim vectors",
                embedder.model_id(),
                embedder.dimension(),
                corpus.dimension()
            )));
        }

        let index = SimilarityIndex::from_corpus(&corpus)?;
        info!(
            rows = index.matrix().rows(),
            dimension = index.matrix().dimension(),
            "vector matrix initialized"
        );

        Ok(Self {
            corpus,
            index,
            embedder,
            options,
        })
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn options(&self) -> &RetrieverOptions {
        &self.options
    }

    /// Embed `query` and rank every chunk against it
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredIndex>> {
        if query.trim().is_empty() {
            return Err(RagError::InvalidArgument("query is empty".to_string()));
        }
        validate_k(k, self.corpus.len())?;

        let started = Instant::now();
        let embed_options = EmbedOptions {
            batch_size: self.options.batch_size,
            normalize: self.options.normalize_query,
        };
        let query_vector = self.embedder.embed(query, &embed_options)?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "query embedded");

        let started = Instant::now();
        let hits = self.index.search(&query_vector, k)?;
        debug!(k, elapsed_ms = started.elapsed().as_millis() as u64, "similarity search done");

        Ok(hits)
    }

    /// Top-`k` sources for `query`; any failing step aborts the whole call
    pub fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        let started = Instant::now();
        let hits = self.search(query, k)?;
        let outputs = SourceResolver::new(&self.corpus).resolve(&hits)?;

        info!(
            k,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "sources retrieved"
        );

        Ok(RetrievalResult {
            query: query.to_string(),
            outputs,
        })
    }
}
