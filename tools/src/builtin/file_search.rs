//! `file_search` built-in provider (spec §4.5): query-time embedding via an
//! OpenAI-compatible `/v1/embeddings` client, then a vector lookup through a
//! pluggable `VectorStoreBackend`. Vector store CRUD is exposed as
//! tenant-scoped management routes.

use crate::error::ToolSourceError;
use crate::executor::{Kind, ToolExecutor};
use crate::provider::{Collector, FunctionProvider, ManagementRoute};
use async_trait::async_trait;
use protocol::{ApiError, ToolCall, ToolDefinition, ToolResult, ToolType};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ToolSourceError>;
}

pub struct OpenAiEmbeddingClient {
    base_url: String,
    api_key: String,
    model: String,
    http: reqwest::Client,
}

impl OpenAiEmbeddingClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ToolSourceError> {
        let response = self
            .http
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "input": text, "model": self.model }))
            .send()
            .await
            .map_err(|e| ToolSourceError::Transport(format!("embeddings request failed: {e}")))?;

        let mut parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| ToolSourceError::Transport(format!("embeddings response invalid: {e}")))?;

        parsed
            .data
            .pop()
            .map(|datum| datum.embedding)
            .ok_or_else(|| ToolSourceError::Transport("embeddings response had no data".to_string()))
    }
}

pub struct VectorHit {
    pub text: String,
    pub score: f32,
}

#[async_trait]
pub trait VectorStoreBackend: Send + Sync {
    async fn search(
        &self,
        tenant: &str,
        store_name: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<VectorHit>, ToolSourceError>;

    async fn create_store(&self, tenant: &str, name: &str) -> Result<(), ToolSourceError>;

    async fn delete_store(&self, tenant: &str, name: &str) -> Result<(), ToolSourceError>;
}

#[derive(Deserialize)]
struct FileSearchArgs {
    query: String,
    #[serde(default)]
    vector_store: Option<String>,
}

pub struct FileSearchProvider {
    embeddings: Box<dyn EmbeddingClient>,
    vector_store: Arc<dyn VectorStoreBackend>,
    default_store: String,
    top_k: usize,
    queries_served: AtomicU64,
}

impl FileSearchProvider {
    pub fn new(
        embeddings: Box<dyn EmbeddingClient>,
        vector_store: Arc<dyn VectorStoreBackend>,
        default_store: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            embeddings,
            vector_store,
            default_store: default_store.into(),
            top_k,
            queries_served: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl ToolExecutor for FileSearchProvider {
    fn kind(&self) -> Kind {
        Kind::Sandbox
    }

    async fn can_execute(&self, name: &str) -> bool {
        name == "file_search"
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let args: FileSearchArgs = match serde_json::from_str(&call.arguments) {
            Ok(args) => args,
            Err(e) => return ToolResult::error(call.id.clone(), format!("invalid file_search arguments: {e}")),
        };
        let store = args.vector_store.as_deref().unwrap_or(&self.default_store);

        let vector = match self.embeddings.embed(&args.query).await {
            Ok(vector) => vector,
            Err(err) => return ToolResult::error(call.id.clone(), format!("embedding failed: {err}")),
        };

        match self.vector_store.search("", store, &vector, self.top_k).await {
            Ok(hits) => {
                self.queries_served.fetch_add(1, Ordering::Relaxed);
                if hits.is_empty() {
                    ToolResult::ok(call.id.clone(), "No matching documents found.")
                } else {
                    let formatted = hits
                        .iter()
                        .enumerate()
                        .map(|(i, hit)| format!("{}. (score {:.3}) {}", i + 1, hit.score, hit.text))
                        .collect::<Vec<_>>()
                        .join("\n");
                    ToolResult::ok(call.id.clone(), formatted)
                }
            }
            Err(err) => ToolResult::error(call.id.clone(), format!("vector search failed: {err}")),
        }
    }
}

struct CreateVectorStoreRoute(Arc<dyn VectorStoreBackend>);

#[async_trait]
impl ManagementRoute for CreateVectorStoreRoute {
    fn method(&self) -> &str {
        "POST"
    }

    fn path(&self) -> &str {
        "/v1/vector_stores"
    }

    async fn handle(&self, tenant: &str, body: serde_json::Value) -> Result<serde_json::Value, ApiError> {
        let name = body
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ApiError::validation("name is required", "name"))?;
        self.0
            .create_store(tenant, name)
            .await
            .map_err(ApiError::from)?;
        Ok(serde_json::json!({ "name": name, "created": true }))
    }
}

struct DeleteVectorStoreRoute(Arc<dyn VectorStoreBackend>);

#[async_trait]
impl ManagementRoute for DeleteVectorStoreRoute {
    fn method(&self) -> &str {
        "DELETE"
    }

    fn path(&self) -> &str {
        "/v1/vector_stores/{name}"
    }

    async fn handle(&self, tenant: &str, body: serde_json::Value) -> Result<serde_json::Value, ApiError> {
        let name = body
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ApiError::validation("name is required", "name"))?;
        self.0
            .delete_store(tenant, name)
            .await
            .map_err(ApiError::from)?;
        Ok(serde_json::json!({ "name": name, "deleted": true }))
    }
}

struct QueriesServedCollector(Arc<AtomicU64>);

impl Collector for QueriesServedCollector {
    fn name(&self) -> &str {
        "file_search_queries_served_total"
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::json!(self.0.load(Ordering::Relaxed))
    }
}

#[async_trait]
impl FunctionProvider for FileSearchProvider {
    fn name(&self) -> &str {
        "file_search"
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            tool_type: ToolType::Function,
            name: "file_search".to_string(),
            description: Some("Search indexed documents for content relevant to a query.".to_string()),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "vector_store": { "type": "string" }
                },
                "required": ["query"]
            }),
            strict: None,
        }]
    }

    fn routes(&self) -> Vec<Box<dyn ManagementRoute>> {
        vec![
            Box::new(CreateVectorStoreRoute(self.vector_store.clone())),
            Box::new(DeleteVectorStoreRoute(self.vector_store.clone())),
        ]
    }

    fn collectors(&self) -> Vec<Box<dyn Collector>> {
        // Snapshot the current count into a fresh Arc; the provider keeps
        // its own counter alive for the rest of its lifetime.
        vec![Box::new(QueriesServedCollector(Arc::new(AtomicU64::new(
            self.queries_served.load(Ordering::Relaxed),
        ))))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::CallId;

    struct StubEmbeddings;
    #[async_trait]
    impl EmbeddingClient for StubEmbeddings {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ToolSourceError> {
            Ok(vec![0.1, 0.2, 0.3])
        }
    }

    struct StubVectorStore(Vec<VectorHit>);
    #[async_trait]
    impl VectorStoreBackend for StubVectorStore {
        async fn search(
            &self,
            _tenant: &str,
            _store_name: &str,
            _vector: &[f32],
            top_k: usize,
        ) -> Result<Vec<VectorHit>, ToolSourceError> {
            Ok(self
                .0
                .iter()
                .take(top_k)
                .map(|h| VectorHit {
                    text: h.text.clone(),
                    score: h.score,
                })
                .collect())
        }

        async fn create_store(&self, _tenant: &str, _name: &str) -> Result<(), ToolSourceError> {
            Ok(())
        }

        async fn delete_store(&self, _tenant: &str, _name: &str) -> Result<(), ToolSourceError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn formats_hits_with_scores() {
        let provider = FileSearchProvider::new(
            Box::new(StubEmbeddings),
            Arc::new(StubVectorStore(vec![VectorHit {
                text: "relevant doc".to_string(),
                score: 0.92,
            }])),
            "default",
            5,
        );
        let call = ToolCall {
            id: CallId::new(),
            name: "file_search".to_string(),
            arguments: r#"{"query":"hello"}"#.to_string(),
        };
        let result = provider.execute(&call).await;
        assert!(!result.is_error);
        assert!(result.output.contains("relevant doc"));
        assert!(result.output.contains("0.920"));
    }

    #[tokio::test]
    async fn empty_results_says_so_plainly() {
        let provider = FileSearchProvider::new(
            Box::new(StubEmbeddings),
            Arc::new(StubVectorStore(vec![])),
            "default",
            5,
        );
        let call = ToolCall {
            id: CallId::new(),
            name: "file_search".to_string(),
            arguments: r#"{"query":"hello"}"#.to_string(),
        };
        let result = provider.execute(&call).await;
        assert_eq!(result.output, "No matching documents found.");
    }

    #[tokio::test]
    async fn create_vector_store_route_requires_name() {
        let route = CreateVectorStoreRoute(Arc::new(StubVectorStore(vec![])));
        let err = route.handle("tenant-a", serde_json::json!({})).await.unwrap_err();
        assert_eq!(err.param.as_deref(), Some("name"));
    }
}
