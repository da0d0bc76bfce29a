// Tokenizer-aware text chunking with overlapping windows
use serde::{Deserialize, Serialize};
use std::ops::{Deref, Range};
use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::corpus::PageText;
use crate::errors::{RagError, Result};

/// Token ids in, text out; lets the chunker run without a model download
pub trait TokenCodec: Send + Sync {
    /// Encode without special tokens
    fn encode(&self, text: &str) -> Result<Vec<u32>>;
    fn decode(&self, ids: &[u32]) -> Result<String>;
}

impl TokenCodec for Tokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        // inherent TokenizerImpl methods; the trait methods share their names
        let encoding = Deref::deref(self)
            .encode(text, false)
            .map_err(|e| RagError::Embedding(format!("tokenization failed: {}", e)))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        Deref::deref(self)
            .decode(ids, true)
            .map_err(|e| RagError::Embedding(format!("detokenization failed: {}", e)))
    }
}

/// Chunks cut from one page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageChunks {
    pub page_number: u32,
    pub chunks: Vec<String>,
    /// Largest chunk in tokens, 0 for a page without tokens
    pub max_chunk_tokens: usize,
}

/// Windows over `len` tokens of at most `tokens_per_chunk`, each starting
/// `tokens_per_chunk - overlap` after the previous one
pub fn token_windows(len: usize, tokens_per_chunk: usize, overlap: usize) -> Result<Vec<Range<usize>>> {
    if tokens_per_chunk == 0 {
        return Err(RagError::InvalidArgument("tokens per chunk must be positive".to_string()));
    }
    if overlap >= tokens_per_chunk {
        return Err(RagError::InvalidArgument(format!(
            "chunk overlap ({}) must be smaller than tokens per chunk ({})",
            overlap, tokens_per_chunk
        )));
    }

    let stride = tokens_per_chunk - overlap;
    let mut windows = Vec::new();
    let mut start = 0;
    while start < len {
        let end = (start + tokens_per_chunk).min(len);
        windows.push(start..end);
        if end == len {
            break;
        }
        start += stride;
    }
    Ok(windows)
}

/// Splits page text into overlapping token windows
pub struct TokenChunker {
    codec: Arc<dyn TokenCodec>,
    tokens_per_chunk: usize,
    overlap: usize,
}

impl TokenChunker {
    pub fn new(codec: Arc<dyn TokenCodec>, tokens_per_chunk: usize, overlap: usize) -> Result<Self> {
        // validates the pair once up front
        token_windows(0, tokens_per_chunk, overlap)?;
        Ok(Self {
            codec,
            tokens_per_chunk,
            overlap,
        })
    }

    pub fn split_text(&self, text: &str) -> Result<Vec<String>> {
        let ids = self.codec.encode(text)?;
        token_windows(ids.len(), self.tokens_per_chunk, self.overlap)?
            .into_iter()
            .map(|range| self.codec.decode(&ids[range]))
            .collect()
    }

    pub fn count_tokens(&self, text: &str) -> Result<usize> {
        Ok(self.codec.encode(text)?.len())
    }

    pub fn chunk_page(&self, page: &PageText) -> Result<PageChunks> {
        let chunks = self.split_text(&page.page_text)?;
        let mut max_chunk_tokens = 0;
        for chunk in &chunks {
            max_chunk_tokens = max_chunk_tokens.max(self.count_tokens(chunk)?);
        }

        Ok(PageChunks {
            page_number: page.page_number,
            chunks,
            max_chunk_tokens,
        })
    }
}
