//! Configuration management for local-rag
//!
//! TOML file with one section per stage. Every section has defaults, so a
//! partial file (or none at all) is valid.
//! Location: ~/.local-rag/config.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::embedding::{DeviceHint, Pooling};
use crate::errors::{RagError, Result};
use crate::rag::context::ContextSource;

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub corpus: CorpusConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub chunking: ChunkingConfig,
    pub generation: GenerationConfig,
    pub prompt: PromptConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Dataset locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    pub pages_text_path: PathBuf,
    pub embeddings_path: PathBuf,
}

/// Embedding model selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model_id: String,
    pub revision: String,
    pub device: DeviceHint,
    pub pooling: Pooling,
    pub batch_size: usize,
    pub max_length: usize,
    /// Normalize query vectors like the stored chunk vectors
    pub normalize_query: bool,
}

/// Retrieval defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub context_source: ContextSource,
    pub max_context_tokens: Option<usize>,
}

/// Token chunking for indexing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub tokens_per_chunk: usize,
    pub chunk_overlap: usize,
}

/// Ollama generation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub host: String,
    pub port: u16,
    pub model: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub do_sample: bool,
    pub timeout_secs: u64,
}

/// Prompt template file (YAML with `prompt.template`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub template_path: Option<PathBuf>,
}

/// HTTP surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Log level and optional log directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            pages_text_path: PathBuf::from("datasets/pages-text.json"),
            embeddings_path: PathBuf::from("datasets/embeddings.json"),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: "BAAI/bge-base-en-v1.5".to_string(),
            revision: "main".to_string(),
            device: DeviceHint::Auto,
            pooling: Pooling::Cls,
            batch_size: 32,
            max_length: 512,
            normalize_query: true,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            context_source: ContextSource::Page,
            max_context_tokens: None,
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            tokens_per_chunk: 384,
            chunk_overlap: 50,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 11434,
            model: "gemma2:2b".to_string(),
            max_new_tokens: 256,
            temperature: 0.3,
            do_sample: true,
            timeout_secs: 120,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl GenerationConfig {
    /// Ollama base URL
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl Config {
    /// Load from the default location, creating a default file if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            let config = Config::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    /// Load from an explicit file, which must exist
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            RagError::Config(format!("failed to read '{}': {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&contents).map_err(|e| {
            RagError::Config(format!("failed to parse '{}': {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| RagError::Config(format!("failed to serialize config: {}", e)))?;
        fs::write(path, toml_string)?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| RagError::Config("could not determine home directory".to_string()))?;

        Ok(home.join(".local-rag").join("config.toml"))
    }

    /// Reject values no stage can run with
    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(RagError::Config("retrieval.top_k must be positive".to_string()));
        }
        if self.embedding.batch_size == 0 {
            return Err(RagError::Config("embedding.batch_size must be positive".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.tokens_per_chunk {
            return Err(RagError::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than tokens_per_chunk ({})",
                self.chunking.chunk_overlap, self.chunking.tokens_per_chunk
            )));
        }
        if self.generation.temperature.is_nan() || self.generation.temperature < 0.0 {
            return Err(RagError::Config(
                "generation.temperature must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}
