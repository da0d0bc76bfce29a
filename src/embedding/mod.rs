//! Embedding client: text in, fixed-length dense vector out.
//!
//! The model is constructed once by the caller and injected wherever it is
//! needed; nothing here holds process-wide state.

pub mod engine;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{RagError, Result};

pub use engine::CandleEmbedder;

/// Per-call encoding options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbedOptions {
    /// Texts per forward pass
    pub batch_size: usize,
    /// Scale each output vector to unit length
    pub normalize: bool,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            batch_size: 32,
            normalize: true,
        }
    }
}

/// Sentence-embedding model with a fixed identity and dimension
pub trait Embedder: Send + Sync {
    /// Model identifier, e.g. a HuggingFace repo id
    fn model_id(&self) -> &str;

    /// Length of every vector this model returns
    fn dimension(&self) -> usize;

    /// Embed a batch; output order matches input order
    fn embed_batch(&self, texts: &[&str], options: &EmbedOptions) -> Result<Vec<Vec<f32>>>;

    /// Embed one non-empty text
    fn embed(&self, text: &str, options: &EmbedOptions) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(RagError::Embedding("cannot embed empty text".to_string()));
        }
        self.embed_batch(&[text], options)?
            .pop()
            .ok_or_else(|| RagError::Embedding("model returned no vector".to_string()))
    }
}

/// Where the model runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum DeviceHint {
    /// CUDA device 0 when available, otherwise CPU
    #[default]
    Auto,
    Cpu,
    Cuda(usize),
}

impl FromStr for DeviceHint {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(DeviceHint::Auto),
            "cpu" => Ok(DeviceHint::Cpu),
            "cuda" => Ok(DeviceHint::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|ordinal| ordinal.parse().ok())
                .map(DeviceHint::Cuda)
                .ok_or_else(|| RagError::Config(format!("unknown device '{}'", s))),
        }
    }
}

impl TryFrom<String> for DeviceHint {
    type Error = RagError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DeviceHint> for String {
    fn from(hint: DeviceHint) -> Self {
        hint.to_string()
    }
}

impl fmt::Display for DeviceHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceHint::Auto => write!(f, "auto"),
            DeviceHint::Cpu => write!(f, "cpu"),
            DeviceHint::Cuda(ordinal) => write!(f, "cuda:{}", ordinal),
        }
    }
}

/// How token states are reduced to one sentence vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Pooling {
    /// First ([CLS]) token state
    #[default]
    Cls,
    /// Attention-masked mean over all tokens
    Mean,
}

/// Scale `vector` to unit L2 norm in place; zero vectors are left untouched
pub fn normalize_l2(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
}
