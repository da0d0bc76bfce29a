//! Offline preprocessing: page cleanup, token chunking and embedding.
//!
//! PDF layout parsing happens upstream; this stage starts from page-indexed
//! text and produces the embeddings dataset the retriever loads.

pub mod chunker;
pub mod indexer;
pub mod text;

pub use chunker::{token_windows, PageChunks, TokenChunker, TokenCodec};
pub use indexer::{IndexJob, IndexOutcome, Indexer, PageSelection};
pub use text::{basic_format, clean_page_text, clean_pages, filter_page_range, offset_pages, remove_hyphens};
