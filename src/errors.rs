//! Error types for local-rag
//!
//! Every failure in the retrieval path surfaces synchronously to the caller
//! as a [`RagError`]; nothing is retried internally.

use thiserror::Error;

/// Main error type for loading, retrieval and generation
#[derive(Error, Debug)]
pub enum RagError {
    /// Malformed, missing or empty input datasets
    #[error("Data format error: {0}")]
    DataFormat(String),

    /// Embedding model failure or empty input text
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Bad `k`, empty query, mismatched dimensions
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A chunk's page id has no matching page text
    #[error("Resolution error: no page text for page id {page_id}")]
    Resolution { page_id: u32 },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Prompt template loading or rendering errors
    #[error("Template error: {0}")]
    Template(String),

    /// Generation collaborator errors
    #[error("Generation error: {0}")]
    Generation(String),

    /// Tensor backend errors
    #[error("Compute error: {0}")]
    Compute(#[from] candle_core::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Generic(String),
}

/// Result type alias for local-rag operations
pub type Result<T> = std::result::Result<T, RagError>;

impl RagError {
    /// True for errors caused by the caller's input rather than the corpus or a collaborator
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, RagError::InvalidArgument(_))
    }
}

impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Generic(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_error_names_page() {
        let err = RagError::Resolution { page_id: 42 };
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_invalid_argument_classification() {
        assert!(RagError::InvalidArgument("k".into()).is_invalid_argument());
        assert!(!RagError::DataFormat("empty".into()).is_invalid_argument());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: RagError = io.into();
        assert!(matches!(err, RagError::Io(_)));
    }
}
