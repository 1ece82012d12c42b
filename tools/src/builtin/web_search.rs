//! `web_search` built-in provider (spec §4.5): `{query: string}`, adapter
//! abstraction over the actual search backend, default SearXNG-style HTTP
//! backend with HTML stripped from snippets, capped to `max_results`.

use crate::error::ToolSourceError;
use crate::executor::{Kind, ToolExecutor};
use crate::provider::FunctionProvider;
use async_trait::async_trait;
use protocol::{ToolCall, ToolDefinition, ToolResult, ToolType};
use serde::Deserialize;

pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ToolSourceError>;
}

/// Default backend: a SearXNG-compatible `/search?format=json` endpoint.
pub struct SearxngBackend {
    base_url: String,
    http: reqwest::Client,
}

impl SearxngBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngResult>,
}

#[derive(Deserialize)]
struct SearxngResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
}

#[async_trait]
impl SearchBackend for SearxngBackend {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, ToolSourceError> {
        let response = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[("q", query), ("format", "json")])
            .send()
            .await
            .map_err(|e| ToolSourceError::Transport(format!("searxng request failed: {e}")))?;

        let parsed: SearxngResponse = response
            .json()
            .await
            .map_err(|e| ToolSourceError::Transport(format!("searxng response invalid: {e}")))?;

        Ok(parsed
            .results
            .into_iter()
            .take(max_results)
            .map(|r| SearchHit {
                title: strip_html(&r.title),
                url: r.url,
                snippet: strip_html(&r.content),
            })
            .collect())
    }
}

/// Minimal tag stripper; good enough for search-engine snippet HTML.
fn strip_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

#[derive(Deserialize)]
struct WebSearchArgs {
    query: String,
}

pub struct WebSearchProvider {
    backend: Box<dyn SearchBackend>,
    max_results: usize,
}

impl WebSearchProvider {
    pub fn new(backend: Box<dyn SearchBackend>, max_results: usize) -> Self {
        Self { backend, max_results }
    }
}

#[async_trait]
impl ToolExecutor for WebSearchProvider {
    fn kind(&self) -> Kind {
        Kind::Sandbox
    }

    async fn can_execute(&self, name: &str) -> bool {
        name == "web_search"
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let args: WebSearchArgs = match serde_json::from_str(&call.arguments) {
            Ok(args) => args,
            Err(e) => return ToolResult::error(call.id.clone(), format!("invalid web_search arguments: {e}")),
        };

        match self.backend.search(&args.query, self.max_results).await {
            Ok(hits) if hits.is_empty() => {
                ToolResult::ok(call.id.clone(), "No results found.")
            }
            Ok(hits) => {
                let formatted = hits
                    .iter()
                    .enumerate()
                    .map(|(i, hit)| format!("{}. {} ({})\n{}", i + 1, hit.title, hit.url, hit.snippet))
                    .collect::<Vec<_>>()
                    .join("\n\n");
                ToolResult::ok(call.id.clone(), formatted)
            }
            Err(err) => ToolResult::error(call.id.clone(), format!("web_search failed: {err}")),
        }
    }
}

#[async_trait]
impl FunctionProvider for WebSearchProvider {
    fn name(&self) -> &str {
        "web_search"
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            tool_type: ToolType::Function,
            name: "web_search".to_string(),
            description: Some("Search the web and return a numbered list of results.".to_string()),
            parameters: serde_json::json!({
                "type": "object",
                "properties": { "query": { "type": "string" } },
                "required": ["query"]
            }),
            strict: None,
        }]
    }
}
