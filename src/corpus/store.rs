//! Loading and exporting the JSON datasets behind a [`Corpus`].
//!
//! Both datasets are read wholesale into memory; there is no streaming or
//! partial load. A corpus is immutable once built.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::corpus::types::{ChunkEmbedding, PageText};
use crate::errors::{RagError, Result};

/// Page texts plus chunk embeddings, validated against each other
#[derive(Debug, Clone)]
pub struct Corpus {
    pages: Vec<PageText>,
    chunks: Vec<ChunkEmbedding>,
    page_lookup: HashMap<u32, usize>,
    dimension: usize,
}

/// Result of an export that may refuse to overwrite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    Written,
    Skipped,
}

impl Corpus {
    /// Build a corpus from in-memory datasets.
    ///
    /// Fails with `DataFormat` on empty datasets, page numbers below 1,
    /// duplicate page numbers or inconsistent embedding dimensions, and with
    /// `Resolution` when a chunk id has no page.
    pub fn new(pages: Vec<PageText>, chunks: Vec<ChunkEmbedding>) -> Result<Self> {
        if pages.is_empty() {
            return Err(RagError::DataFormat(
                "pages text must be a non-empty list".to_string(),
            ));
        }
        if chunks.is_empty() {
            return Err(RagError::DataFormat(
                "embeddings must be a non-empty list".to_string(),
            ));
        }

        let mut page_lookup = HashMap::with_capacity(pages.len());
        for (idx, page) in pages.iter().enumerate() {
            if page.page_number == 0 {
                return Err(RagError::DataFormat(
                    "page numbers start at 1".to_string(),
                ));
            }
            if page_lookup.insert(page.page_number, idx).is_some() {
                return Err(RagError::DataFormat(format!(
                    "duplicate page number {}",
                    page.page_number
                )));
            }
        }

        let dimension = chunks[0].dimension();
        if dimension == 0 {
            return Err(RagError::DataFormat(
                "embedding vectors must not be empty".to_string(),
            ));
        }
        for (idx, chunk) in chunks.iter().enumerate() {
            if chunk.dimension() != dimension {
                return Err(RagError::DataFormat(format!(
                    "embedding {} has dimension {}, expected {}",
                    idx,
                    chunk.dimension(),
                    dimension
                )));
            }
            if !page_lookup.contains_key(&chunk.id) {
                return Err(RagError::Resolution { page_id: chunk.id });
            }
        }

        Ok(Self {
            pages,
            chunks,
            page_lookup,
            dimension,
        })
    }

    /// Load `pages-text.json` and `embeddings.json` style files
    pub fn load(pages_path: &Path, embeddings_path: &Path) -> Result<Self> {
        let pages: Vec<PageText> = load_json_list(pages_path)?;
        info!(count = pages.len(), path = %pages_path.display(), "pages text loaded");

        let chunks: Vec<ChunkEmbedding> = load_json_list(embeddings_path)?;
        info!(count = chunks.len(), path = %embeddings_path.display(), "embeddings loaded");

        Self::new(pages, chunks)
    }

    pub fn pages(&self) -> &[PageText] {
        &self.pages
    }

    /// Chunks in source order; index `i` is row `i` of the vector matrix
    pub fn chunks(&self) -> &[ChunkEmbedding] {
        &self.chunks
    }

    pub fn chunk(&self, index: usize) -> Option<&ChunkEmbedding> {
        self.chunks.get(index)
    }

    pub fn page(&self, page_number: u32) -> Option<&PageText> {
        self.page_lookup
            .get(&page_number)
            .map(|&idx| &self.pages[idx])
    }

    /// Number of chunks (rows)
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding dimensionality D
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Read a JSON file that must hold a non-empty list of `T`
pub fn load_json_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let contents = fs::read(path).map_err(|e| {
        RagError::DataFormat(format!("cannot read '{}': {}", path.display(), e))
    })?;

    let items: Vec<T> = serde_json::from_slice(&contents).map_err(|e| {
        RagError::DataFormat(format!(
            "'{}' is not a list of the expected records: {}",
            path.display(),
            e
        ))
    })?;

    if items.is_empty() {
        return Err(RagError::DataFormat(format!(
            "'{}' holds an empty list",
            path.display()
        )));
    }

    Ok(items)
}

/// Write `items` as pretty JSON; an existing file is kept unless `force_overwrite`
pub fn export_json<T: Serialize>(
    path: &Path,
    items: &[T],
    force_overwrite: bool,
) -> Result<ExportOutcome> {
    if items.is_empty() {
        return Err(RagError::DataFormat("nothing to export".to_string()));
    }

    if path.is_file() && !force_overwrite {
        info!(path = %path.display(), "file exists, export skipped");
        return Ok(ExportOutcome::Skipped);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(items)?;
    fs::write(path, json)?;
    info!(path = %path.display(), count = items.len(), "exported");

    Ok(ExportOutcome::Written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn pages() -> Vec<PageText> {
        vec![PageText::new(1, "one"), PageText::new(2, "two")]
    }

    #[test]
    fn test_corpus_valid() {
        let corpus = Corpus::new(
            pages(),
            vec![
                ChunkEmbedding::new(1, "a", vec![1.0, 0.0]),
                ChunkEmbedding::new(2, "b", vec![0.0, 1.0]),
            ],
        )
        .unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.dimension(), 2);
        assert_eq!(corpus.page(2).unwrap().page_text, "two");
        assert!(corpus.page(9).is_none());
    }

    #[test]
    fn test_corpus_rejects_empty_datasets() {
        let err = Corpus::new(vec![], vec![ChunkEmbedding::new(1, "a", vec![1.0])]).unwrap_err();
        assert!(matches!(err, RagError::DataFormat(_)));

        let err = Corpus::new(pages(), vec![]).unwrap_err();
        assert!(matches!(err, RagError::DataFormat(_)));
    }

    #[test]
    fn test_corpus_rejects_unknown_page_id() {
        let err = Corpus::new(pages(), vec![ChunkEmbedding::new(7, "a", vec![1.0])]).unwrap_err();
        assert!(matches!(err, RagError::Resolution { page_id: 7 }));
    }

    #[test]
    fn test_corpus_rejects_ragged_dimensions() {
        let err = Corpus::new(
            pages(),
            vec![
                ChunkEmbedding::new(1, "a", vec![1.0, 0.0]),
                ChunkEmbedding::new(2, "b", vec![1.0]),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, RagError::DataFormat(_)));
    }

    #[test]
    fn test_corpus_rejects_duplicate_pages() {
        let err = Corpus::new(
            vec![PageText::new(1, "a"), PageText::new(1, "b")],
            vec![ChunkEmbedding::new(1, "a", vec![1.0])],
        )
        .unwrap_err();
        assert!(matches!(err, RagError::DataFormat(_)));
    }

    #[test]
    fn test_load_json_list_shapes() {
        let mut not_a_list = tempfile::NamedTempFile::new().unwrap();
        write!(not_a_list, r#"{{"page_number": 1, "page_text": "x"}}"#).unwrap();
        let err = load_json_list::<PageText>(not_a_list.path()).unwrap_err();
        assert!(matches!(err, RagError::DataFormat(_)));

        let mut empty = tempfile::NamedTempFile::new().unwrap();
        write!(empty, "[]").unwrap();
        let err = load_json_list::<PageText>(empty.path()).unwrap_err();
        assert!(matches!(err, RagError::DataFormat(_)));

        let err = load_json_list::<PageText>(Path::new("/nonexistent/pages-text.json")).unwrap_err();
        assert!(matches!(err, RagError::DataFormat(_)));
    }

    #[test]
    fn test_export_respects_force_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pages-text.json");

        assert_eq!(export_json(&path, &pages(), false).unwrap(), ExportOutcome::Written);
        assert_eq!(export_json(&path, &pages()[..1], false).unwrap(), ExportOutcome::Skipped);
        assert_eq!(load_json_list::<PageText>(&path).unwrap().len(), 2);

        assert_eq!(export_json(&path, &pages()[..1], true).unwrap(), ExportOutcome::Written);
        assert_eq!(load_json_list::<PageText>(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_export_empty_list_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = export_json::<PageText>(&dir.path().join("x.json"), &[], true).unwrap_err();
        assert!(matches!(err, RagError::DataFormat(_)));
    }
}
