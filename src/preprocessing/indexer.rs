// Builds the embeddings dataset: pages -> token chunks -> normalized vectors
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::corpus::{export_json, load_json_list, ChunkEmbedding, PageText};
use crate::embedding::{EmbedOptions, Embedder};
use crate::errors::{RagError, Result};
use crate::preprocessing::chunker::{PageChunks, TokenChunker};
use crate::preprocessing::text::{clean_pages, filter_page_range, offset_pages};

/// Page transforms applied before chunking, in this order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    pub page_offset: i64,
    pub first_page: u32,
    /// Defaults to the page count
    pub last_page: Option<u32>,
    pub clean: bool,
}

impl Default for PageSelection {
    fn default() -> Self {
        Self {
            page_offset: 0,
            first_page: 1,
            last_page: None,
            clean: false,
        }
    }
}

impl PageSelection {
    pub fn apply(&self, pages: Vec<PageText>) -> Vec<PageText> {
        let pages = offset_pages(pages, self.page_offset);
        let pages = filter_page_range(pages, self.first_page, self.last_page);
        if self.clean {
            clean_pages(pages)
        } else {
            pages
        }
    }
}

/// Files read and written by one indexing run
#[derive(Debug, Clone)]
pub struct IndexJob {
    pub pages_input: PathBuf,
    /// Where the selected pages go; chunk ids refer to this list
    pub pages_output: PathBuf,
    pub embeddings_output: PathBuf,
    pub selection: PageSelection,
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    Written {
        pages: usize,
        chunks: usize,
        /// False when `pages_output` already held exactly the selected pages
        pages_exported: bool,
    },
    /// An output exists and `force` was not set; nothing was written
    Skipped { existing: PathBuf },
}

/// Chunking and embedding for the offline indexing stage
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    chunker: TokenChunker,
    batch_size: usize,
    show_progress: bool,
}

impl Indexer {
    pub fn new(embedder: Arc<dyn Embedder>, chunker: TokenChunker) -> Self {
        Self {
            embedder,
            chunker,
            batch_size: EmbedOptions::default().batch_size,
            show_progress: false,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Split every page into token chunks
    pub fn chunk_pages(&self, pages: &[PageText]) -> Result<Vec<PageChunks>> {
        if pages.is_empty() {
            return Err(RagError::DataFormat("text data is required for chunking".to_string()));
        }

        let pb = self.progress_bar(pages.len() as u64, "Chunking text");
        let mut chunked = Vec::with_capacity(pages.len());
        for page in pages {
            chunked.push(self.chunker.chunk_page(page)?);
            pb.inc(1);
        }
        pb.finish_and_clear();

        let total: usize = chunked.iter().map(|p| p.chunks.len()).sum();
        let max_tokens = chunked.iter().map(|p| p.max_chunk_tokens).max().unwrap_or(0);
        info!(pages = chunked.len(), chunks = total, max_tokens, "text chunking completed");

        Ok(chunked)
    }

    /// Embed every chunk (unit-normalized) in page/chunk order
    pub fn embed_chunks(&self, pages: &[PageChunks]) -> Result<Vec<ChunkEmbedding>> {
        let items: Vec<(u32, &str)> = pages
            .iter()
            .flat_map(|p| p.chunks.iter().map(move |c| (p.page_number, c.as_str())))
            .collect();
        if items.is_empty() {
            return Err(RagError::DataFormat(
                "text must be chunked before calculating embeddings".to_string(),
            ));
        }

        let options = EmbedOptions {
            batch_size: self.batch_size,
            normalize: true,
        };
        let started = Instant::now();
        let pb = self.progress_bar(items.len() as u64, "Embedding chunks");

        let mut embeddings = Vec::with_capacity(items.len());
        for batch in items.chunks(self.batch_size.max(1)) {
            let texts: Vec<&str> = batch.iter().map(|(_, text)| *text).collect();
            let vectors = self.embedder.embed_batch(&texts, &options)?;
            if vectors.len() != batch.len() {
                return Err(RagError::Embedding(format!(
                    "model returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }
            for ((page_number, text), vector) in batch.iter().zip(vectors) {
                embeddings.push(ChunkEmbedding::new(*page_number, *text, vector));
            }
            pb.inc(batch.len() as u64);
        }
        pb.finish_and_clear();

        info!(
            chunks = embeddings.len(),
            model = self.embedder.model_id(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "embedding calculation completed"
        );

        Ok(embeddings)
    }

    /// Chunk then embed
    pub fn index(&self, pages: &[PageText]) -> Result<Vec<ChunkEmbedding>> {
        let chunked = self.chunk_pages(pages)?;
        self.embed_chunks(&chunked)
    }

    /// Load pages, apply the selection, embed, then export the selected
    /// pages and the embeddings as one pair.
    ///
    /// The pages are exported unless `pages_output` is the input file and the
    /// selection left it unchanged. Without `force`, any output that would be
    /// written and already exists skips the whole run.
    pub fn run(&self, job: &IndexJob) -> Result<IndexOutcome> {
        let raw: Vec<PageText> = load_json_list(&job.pages_input)?;
        let pages = job.selection.apply(raw.clone());
        if pages.is_empty() {
            return Err(RagError::DataFormat(format!(
                "no pages of '{}' left after page selection",
                job.pages_input.display()
            )));
        }

        let export_pages = pages != raw || !same_file(&job.pages_input, &job.pages_output);

        if !job.force {
            let mut outputs = vec![job.embeddings_output.as_path()];
            if export_pages {
                outputs.push(job.pages_output.as_path());
            }
            if let Some(existing) = outputs.into_iter().find(|path| path.is_file()) {
                info!(path = %existing.display(), "output exists, indexing skipped");
                return Ok(IndexOutcome::Skipped {
                    existing: existing.to_path_buf(),
                });
            }
        }

        let embeddings = self.index(&pages)?;

        if export_pages {
            export_json(&job.pages_output, &pages, true)?;
        }
        export_json(&job.embeddings_output, &embeddings, true)?;

        Ok(IndexOutcome::Written {
            pages: pages.len(),
            chunks: embeddings.len(),
            pages_exported: export_pages,
        })
    }

    fn progress_bar(&self, len: u64, message: &'static str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message);
        pb
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::normalize_l2;
    use crate::preprocessing::chunker::tests::WordCodec;

    /// Vector of (word count, 1), normalized on request
    struct CountingEmbedder;

    impl Embedder for CountingEmbedder {
        fn model_id(&self) -> &str {
            "counting"
        }

        fn dimension(&self) -> usize {
            2
        }

        fn embed_batch(&self, texts: &[&str], options: &EmbedOptions) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![t.split_whitespace().count() as f32, 1.0];
                    if options.normalize {
                        normalize_l2(&mut v);
                    }
                    v
                })
                .collect())
        }
    }

    fn indexer() -> Indexer {
        let chunker = TokenChunker::new(Arc::new(WordCodec::default()), 2, 0).unwrap();
        Indexer::new(Arc::new(CountingEmbedder), chunker).with_batch_size(2)
    }

    #[test]
    fn test_index_ids_follow_pages() {
        let pages = vec![PageText::new(3, "a b c"), PageText::new(4, "d")];
        let embeddings = indexer().index(&pages).unwrap();

        let ids: Vec<u32> = embeddings.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 3, 4]);
        assert_eq!(embeddings[0].text, "a b");
        assert_eq!(embeddings[1].text, "c");
    }

    #[test]
    fn test_stored_vectors_are_unit_length() {
        let embeddings = indexer().index(&[PageText::new(1, "a b c d e")]).unwrap();
        for e in embeddings {
            let norm = e.embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-6);
        }
    }

    fn write_pages(path: &Path, pages: &[PageText]) {
        fs::write(path, serde_json::to_string(pages).unwrap()).unwrap();
    }

    fn raw_pages() -> Vec<PageText> {
        vec![
            PageText::new(1, "cover"),
            PageText::new(2, "Raw page two"),
            PageText::new(3, "Raw page three"),
        ]
    }

    fn job(dir: &Path, selection: PageSelection, force: bool) -> IndexJob {
        IndexJob {
            pages_input: dir.join("pages-text.json"),
            pages_output: dir.join("pages-text.json"),
            embeddings_output: dir.join("embeddings.json"),
            selection,
            force,
        }
    }

    #[test]
    fn test_run_exports_renumbered_pages() {
        let dir = tempfile::tempdir().unwrap();
        let selection = PageSelection {
            page_offset: -1,
            clean: true,
            ..Default::default()
        };
        let job = job(dir.path(), selection, true);
        write_pages(&job.pages_input, &raw_pages());

        let outcome = indexer().run(&job).unwrap();
        assert_eq!(
            outcome,
            IndexOutcome::Written {
                pages: 2,
                chunks: 4,
                pages_exported: true,
            }
        );

        let pages: Vec<PageText> = load_json_list(&job.pages_output).unwrap();
        assert_eq!(pages, vec![PageText::new(1, "raw page two"), PageText::new(2, "raw page three")]);

        let chunks: Vec<ChunkEmbedding> = load_json_list(&job.embeddings_output).unwrap();
        assert_eq!(chunks[0].id, 1);
        assert_eq!(chunks[0].text, "raw page");
        assert_eq!(chunks[3].id, 2);
        assert_eq!(chunks[3].text, "three");
    }

    #[test]
    fn test_run_without_force_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let selection = PageSelection {
            page_offset: -1,
            ..Default::default()
        };
        let job = job(dir.path(), selection, false);
        write_pages(&job.pages_input, &raw_pages());

        let outcome = indexer().run(&job).unwrap();
        assert_eq!(
            outcome,
            IndexOutcome::Skipped {
                existing: job.pages_output.clone()
            }
        );
        assert!(!job.embeddings_output.exists());
        let pages: Vec<PageText> = load_json_list(&job.pages_input).unwrap();
        assert_eq!(pages, raw_pages());
    }

    #[test]
    fn test_run_keeps_unchanged_input() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(dir.path(), PageSelection::default(), false);
        write_pages(&job.pages_input, &raw_pages());

        match indexer().run(&job).unwrap() {
            IndexOutcome::Written { pages_exported, .. } => assert!(!pages_exported),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(job.embeddings_output.is_file());
    }

    #[test]
    fn test_run_rejects_empty_selection() {
        let dir = tempfile::tempdir().unwrap();
        let selection = PageSelection {
            first_page: 9,
            ..Default::default()
        };
        let job = job(dir.path(), selection, true);
        write_pages(&job.pages_input, &raw_pages());

        assert!(matches!(indexer().run(&job).unwrap_err(), RagError::DataFormat(_)));
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert!(matches!(indexer().chunk_pages(&[]).unwrap_err(), RagError::DataFormat(_)));
        let blank = vec![PageText::new(1, "   ")];
        assert!(matches!(indexer().index(&blank).unwrap_err(), RagError::DataFormat(_)));
    }
}
