// Context builder for retrieval-augmented prompts
use serde::{Deserialize, Serialize};

use crate::rag::resolver::RetrievedSource;

/// Which text of a retrieved source goes into the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContextSource {
    /// Full text of the page the chunk came from
    #[default]
    Page,
    /// Only the matched chunk
    Chunk,
}

/// Context assembly configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    pub source: ContextSource,
    /// Estimated token budget; `None` includes every source
    pub max_context_tokens: Option<usize>,
    pub separator: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            source: ContextSource::Page,
            max_context_tokens: None,
            separator: "\n".to_string(),
        }
    }
}

/// Assembled context for prompt augmentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembledContext {
    /// The joined context text
    pub text: String,
    /// Number of sources included
    pub source_count: usize,
    /// Estimated token count
    pub estimated_tokens: usize,
    /// Page ids of the included sources, in rank order
    pub page_ids: Vec<u32>,
}

/// Joins retrieved sources into one context string
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    config: ContextConfig,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ContextConfig) -> Self {
        Self { config }
    }

    /// Build context from sources in rank order.
    ///
    /// With `source = Page`, a page hit by several chunks appears once.
    /// Stops before the first source that would exceed the token budget.
    pub fn build(&self, sources: &[RetrievedSource]) -> AssembledContext {
        let mut parts: Vec<&str> = Vec::new();
        let mut page_ids = Vec::new();
        let mut total_tokens = 0;

        for source in sources {
            if self.config.source == ContextSource::Page && page_ids.contains(&source.id) {
                continue;
            }

            let text = source.text(self.config.source);
            // Rough estimate: ~4 chars per token
            let tokens = text.len().div_ceil(4);

            if let Some(budget) = self.config.max_context_tokens {
                if total_tokens + tokens > budget {
                    break;
                }
            }

            parts.push(text);
            page_ids.push(source.id);
            total_tokens += tokens;
        }

        AssembledContext {
            text: parts.join(&self.config.separator),
            source_count: parts.len(),
            estimated_tokens: total_tokens,
            page_ids,
        }
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }
}
