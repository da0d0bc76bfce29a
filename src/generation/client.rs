//! Ollama API generation client
//!
//! Endpoint: POST /api/generate, non-streaming. Ollama applies the model's
//! chat template, so the rendered prompt is sent as-is.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::GenerationConfig;
use crate::errors::{RagError, Result};
use crate::generation::{GenerationParams, Generator};

/// Ollama generation client
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
    /// Create client with custom configuration
    pub fn with_config(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::Generation(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn from_config(config: &GenerationConfig) -> Result<Self> {
        Self::with_config(
            &config.base_url(),
            &config.model,
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/version", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest::new(&self.model, prompt, params);

        debug!(model = %self.model, prompt_chars = prompt.len(), "sending generate request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::Generation(format!("failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RagError::Generation(format!("HTTP {}: {}", status, error_text)));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| RagError::Generation(format!("failed to parse response: {}", e)))?;

        info!(model = %self.model, eval_count = ?body.eval_count, "generation complete");
        Ok(body.response.trim().to_string())
    }
}

/// Ollama generate request
#[derive(Debug, Clone, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct GenerateOptions {
    num_predict: u32,
    temperature: f32,
}

impl<'a> GenerateRequest<'a> {
    fn new(model: &'a str, prompt: &'a str, params: &GenerationParams) -> Self {
        Self {
            model,
            prompt,
            stream: false,
            options: GenerateOptions {
                num_predict: params.max_new_tokens,
                temperature: params.effective_temperature(),
            },
        }
    }
}

/// Ollama generate response (fields we use)
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_with_config() {
        let client =
            OllamaGenerator::with_config("http://localhost:11434/", "llama3.1:8b", Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.model(), "llama3.1:8b");
        assert_eq!(client.base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_request_body() {
        let params = GenerationParams {
            max_new_tokens: 64,
            temperature: 0.2,
            do_sample: false,
        };
        let body = serde_json::to_value(GenerateRequest::new("gemma2:2b", "hi", &params)).unwrap();
        assert_eq!(body["model"], "gemma2:2b");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 64);
        assert_eq!(body["options"]["temperature"], 0.0);
    }

    #[test]
    fn test_response_parsing() {
        let body: GenerateResponse =
            serde_json::from_str(r#"{"model":"m","response":"  answer \n","done":true}"#).unwrap();
        assert_eq!(body.response.trim(), "answer");
        assert!(body.eval_count.is_none());
    }

    #[tokio::test]
    async fn test_health_check_unreachable() {
        let client =
            OllamaGenerator::with_config("http://127.0.0.1:1", "m", Duration::from_millis(200)).unwrap();
        assert!(!client.health_check().await);
    }
}
