// End-to-end RAG pipeline: retrieve -> build context -> render prompt -> generate
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::errors::{RagError, Result};
use crate::generation::{GenerationParams, Generator};
use crate::prompt::PromptTemplate;
use crate::rag::context::{ContextBuilder, ContextConfig};
use crate::rag::resolver::RetrievedSource;
use crate::rag::retriever::{RetrievalResult, Retriever};

/// Answer to one query together with what produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagAnswer {
    pub query: String,
    pub response: String,
    pub prompt: String,
    pub sources: Vec<RetrievedSource>,
}

/// Owns the injected retriever and generator; shared read-only across requests
pub struct RagPipeline {
    retriever: Arc<Retriever>,
    generator: Arc<dyn Generator>,
    template: PromptTemplate,
    context_builder: ContextBuilder,
    params: GenerationParams,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(
        retriever: Arc<Retriever>,
        generator: Arc<dyn Generator>,
        template: PromptTemplate,
    ) -> Self {
        Self {
            retriever,
            generator,
            template,
            context_builder: ContextBuilder::default(),
            params: GenerationParams::default(),
            top_k: 5,
        }
    }

    pub fn with_context_config(mut self, config: ContextConfig) -> Self {
        self.context_builder = ContextBuilder::with_config(config);
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn retriever(&self) -> &Arc<Retriever> {
        &self.retriever
    }

    /// Run the blocking retrieval off the async executor
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        let retriever = Arc::clone(&self.retriever);
        let query = query.to_string();

        tokio::task::spawn_blocking(move || retriever.retrieve(&query, k))
            .await
            .map_err(|e| RagError::Generic(format!("retrieval task failed: {}", e)))?
    }

    /// Retrieve, augment and generate with the default `k`
    pub async fn answer(&self, query: &str) -> Result<RagAnswer> {
        self.answer_with_k(query, self.top_k).await
    }

    pub async fn answer_with_k(&self, query: &str, k: usize) -> Result<RagAnswer> {
        let retrieval = self.retrieve(query, k).await?;

        let context = self.context_builder.build(&retrieval.outputs);
        let prompt = self.template.render(query, &context.text);
        info!(
            sources = context.source_count,
            estimated_tokens = context.estimated_tokens,
            "prompt augmented"
        );

        let response = self.generator.generate(&prompt, &self.params).await?;

        Ok(RagAnswer {
            query: retrieval.query,
            response,
            prompt,
            sources: retrieval.outputs,
        })
    }
}
