// Joins ranked row indices back to their chunk and page text
use serde::{Deserialize, Serialize};

use crate::corpus::Corpus;
use crate::errors::{RagError, Result};
use crate::rag::context::ContextSource;
use crate::rag::search::ScoredIndex;

/// One retrieved chunk with both its own text and its page's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedSource {
    /// Page number the chunk came from
    pub id: u32,
    /// Row in the corpus / vector matrix
    pub index: usize,
    pub score: f32,
    pub chunk_text: String,
    pub page_text: String,
}

impl RetrievedSource {
    /// Text to feed into a prompt for the given source policy
    pub fn text(&self, source: ContextSource) -> &str {
        match source {
            ContextSource::Page => &self.page_text,
            ContextSource::Chunk => &self.chunk_text,
        }
    }
}

/// Maps search hits to sources using a borrowed corpus
pub struct SourceResolver<'a> {
    corpus: &'a Corpus,
}

impl<'a> SourceResolver<'a> {
    pub fn new(corpus: &'a Corpus) -> Self {
        Self { corpus }
    }

    /// Resolve every hit, preserving input order.
    ///
    /// A hit whose page is missing is a corpus inconsistency and fails the
    /// whole call.
    pub fn resolve(&self, hits: &[ScoredIndex]) -> Result<Vec<RetrievedSource>> {
        hits.iter().map(|hit| self.resolve_one(hit)).collect()
    }

    fn resolve_one(&self, hit: &ScoredIndex) -> Result<RetrievedSource> {
        let chunk = self.corpus.chunk(hit.index).ok_or_else(|| {
            RagError::InvalidArgument(format!(
                "row {} is outside the corpus ({} chunks)",
                hit.index,
                self.corpus.len()
            ))
        })?;

        let page = self
            .corpus
            .page(chunk.id)
            .ok_or(RagError::Resolution { page_id: chunk.id })?;

        Ok(RetrievedSource {
            id: chunk.id,
            index: hit.index,
            score: hit.score,
            chunk_text: chunk.text.clone(),
            page_text: page.page_text.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{ChunkEmbedding, PageText};

    fn corpus() -> Corpus {
        Corpus::new(
            vec![PageText::new(1, "page one"), PageText::new(2, "page two")],
            vec![
                ChunkEmbedding::new(1, "first chunk", vec![1.0]),
                ChunkEmbedding::new(2, "second chunk", vec![1.0]),
                ChunkEmbedding::new(2, "third chunk", vec![1.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_preserves_order() {
        let corpus = corpus();
        let resolver = SourceResolver::new(&corpus);
        let sources = resolver
            .resolve(&[
                ScoredIndex { score: 0.9, index: 2 },
                ScoredIndex { score: 0.4, index: 0 },
            ])
            .unwrap();

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].id, 2);
        assert_eq!(sources[0].chunk_text, "third chunk");
        assert_eq!(sources[0].page_text, "page two");
        assert_eq!(sources[1].id, 1);
        assert_eq!(sources[1].score, 0.4);
    }

    #[test]
    fn test_text_policy() {
        let corpus = corpus();
        let source = SourceResolver::new(&corpus)
            .resolve(&[ScoredIndex { score: 1.0, index: 1 }])
            .unwrap()
            .remove(0);
        assert_eq!(source.text(ContextSource::Page), "page two");
        assert_eq!(source.text(ContextSource::Chunk), "second chunk");
    }

    #[test]
    fn test_out_of_range_row() {
        let corpus = corpus();
        let err = SourceResolver::new(&corpus)
            .resolve(&[ScoredIndex { score: 1.0, index: 9 }])
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }
}
