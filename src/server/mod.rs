//! HTTP surface: one query endpoint over the RAG pipeline.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::errors::RagError;
use crate::rag::{RagPipeline, RetrievalResult};

/// Shared server state
pub struct AppState {
    pub pipeline: RagPipeline,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub k: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
}

/// API error mapped onto a status code and `{"error": msg}` body
#[derive(Debug)]
pub struct ApiError(RagError);

impl From<RagError> for ApiError {
    fn from(err: RagError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = if self.0.is_invalid_argument() {
            StatusCode::BAD_REQUEST
        } else {
            error!(error = %self.0, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let body = Json(json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/query", get(query).post(query))
        .route("/api/retrieve", post(retrieve))
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(state: Arc<AppState>, host: &str, port: u16) -> crate::Result<()> {
    let bind_addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let k = request.k.unwrap_or_else(|| state.pipeline.top_k());
    let answer = state.pipeline.answer_with_k(&request.query, k).await?;
    Ok(Json(QueryResponse {
        response: answer.response,
    }))
}

async fn retrieve(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<RetrievalResult>, ApiError> {
    let k = request.k.unwrap_or_else(|| state.pipeline.top_k());
    let result = state.pipeline.retrieve(&request.query, k).await?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{ChunkEmbedding, Corpus, PageText};
    use crate::embedding::{EmbedOptions, Embedder};
    use crate::generation::{GenerationParams, Generator};
    use crate::prompt::PromptTemplate;
    use crate::rag::Retriever;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    struct ConstEmbedder;

    impl Embedder for ConstEmbedder {
        fn model_id(&self) -> &str {
            "const"
        }

        fn dimension(&self) -> usize {
            1
        }

        fn embed_batch(&self, texts: &[&str], _options: &EmbedOptions) -> crate::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0]).collect())
        }
    }

    struct CannedGenerator;

    #[async_trait]
    impl Generator for CannedGenerator {
        async fn generate(&self, _prompt: &str, _params: &GenerationParams) -> crate::Result<String> {
            Ok("dataplex is a data fabric".to_string())
        }
    }

    fn app() -> Router {
        let corpus = Corpus::new(
            vec![PageText::new(1, "page")],
            vec![ChunkEmbedding::new(1, "chunk", vec![1.0])],
        )
        .unwrap();
        let retriever = Arc::new(Retriever::new(corpus, Arc::new(ConstEmbedder)).unwrap());
        let pipeline = RagPipeline::new(retriever, Arc::new(CannedGenerator), PromptTemplate::default())
            .with_top_k(1);
        router(Arc::new(AppState { pipeline }))
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_query_returns_response() {
        let response = app()
            .oneshot(json_request("GET", "/api/query", json!({"query": "what is dataplex?"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: QueryResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.response, "dataplex is a data fabric");
    }

    #[tokio::test]
    async fn test_bad_k_is_400() {
        let response = app()
            .oneshot(json_request("POST", "/api/query", json!({"query": "q", "k": 5})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_retrieve_endpoint() {
        let response = app()
            .oneshot(json_request("POST", "/api/retrieve", json!({"query": "q"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let result: RetrievalResult = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(result.outputs.len(), 1);
        assert_eq!(result.outputs[0].chunk_text, "chunk");
    }
}
