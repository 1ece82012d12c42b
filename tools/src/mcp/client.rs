//! MCP client: lazy tool discovery across configured servers, JSON-RPC
//! `tools/call` dispatch (spec §4.5). Transport is `streamable-http` (plain
//! JSON-RPC over HTTP POST); an `sse` transport would layer an event stream
//! on top of the same JSON-RPC envelope and is out of scope here.

use crate::error::ToolSourceError;
use crate::executor::{Kind, ToolExecutor};
use crate::mcp::oauth::{OAuthConfig, OAuthTokenCache};
use async_trait::async_trait;
use protocol::{CallId, ToolCall, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum McpTransport {
    Sse,
    StreamableHttp,
}

#[derive(Clone, Debug)]
pub struct McpServerConfig {
    pub name: String,
    pub url: String,
    pub transport: McpTransport,
    pub headers: HashMap<String, String>,
    pub oauth: Option<OAuthConfig>,
}

struct McpServer {
    config: McpServerConfig,
    oauth_cache: Option<OAuthTokenCache>,
}

#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct ToolsListResult {
    #[serde(default)]
    tools: Vec<McpToolSpec>,
}

#[derive(Deserialize)]
struct McpToolSpec {
    name: String,
}

#[derive(Deserialize)]
struct CallToolResult {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    is_error: bool,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Tool source backed by one or more MCP servers. Discovery happens once,
/// on the first `can_execute` call; name collisions resolve to whichever
/// server registered the name first.
pub struct McpToolSource {
    servers: Vec<McpServer>,
    http: reqwest::Client,
    /// Tool name -> index into `servers`.
    discovered: RwLock<Option<HashMap<String, usize>>>,
}

impl McpToolSource {
    pub fn new(configs: Vec<McpServerConfig>) -> Self {
        let servers = configs
            .into_iter()
            .map(|config| McpServer {
                oauth_cache: config.oauth.clone().map(OAuthTokenCache::new),
                config,
            })
            .collect();
        Self {
            servers,
            http: reqwest::Client::new(),
            discovered: RwLock::new(None),
        }
    }

    async fn ensure_discovered(&self) -> Result<(), ToolSourceError> {
        if self.discovered.read().await.is_some() {
            return Ok(());
        }

        let mut guard = self.discovered.write().await;
        if guard.is_some() {
            return Ok(());
        }

        let mut names = HashMap::new();
        for (index, server) in self.servers.iter().enumerate() {
            let result = self.rpc_call(server, "tools/list", serde_json::json!({})).await?;
            let parsed: ToolsListResult = serde_json::from_value(result)
                .map_err(|e| ToolSourceError::Transport(format!("invalid tools/list result: {e}")))?;

            for tool in parsed.tools {
                if names.contains_key(&tool.name) {
                    tracing::warn!(
                        tool = %tool.name,
                        server = %server.config.name,
                        "mcp tool name collision, keeping first registration"
                    );
                } else {
                    names.insert(tool.name, index);
                }
            }
        }

        *guard = Some(names);
        Ok(())
    }

    async fn rpc_call(&self, server: &McpServer, method: &str, params: Value) -> Result<Value, ToolSourceError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let mut builder = self.http.post(&server.config.url).json(&request);
        for (name, value) in &server.config.headers {
            builder = builder.header(name, value);
        }
        if let Some(oauth) = &server.oauth_cache {
            let token = oauth.token().await?;
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ToolSourceError::Transport(format!("mcp request to {:?} failed: {e}", server.config.name)))?;

        let parsed: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| ToolSourceError::Transport(format!("mcp response invalid: {e}")))?;

        if let Some(error) = parsed.error {
            return Err(ToolSourceError::JsonRpc {
                code: error.code,
                message: error.message,
            });
        }
        parsed
            .result
            .ok_or_else(|| ToolSourceError::Transport("mcp response missing result".to_string()))
    }

    async fn call_tool(&self, server_index: usize, name: &str, arguments: Value) -> Result<CallToolResult, ToolSourceError> {
        let server = &self.servers[server_index];
        let result = self
            .rpc_call(
                server,
                "tools/call",
                serde_json::json!({ "name": name, "arguments": arguments }),
            )
            .await?;
        serde_json::from_value(result)
            .map_err(|e| ToolSourceError::Transport(format!("invalid tools/call result: {e}")))
    }
}

#[async_trait]
impl ToolExecutor for McpToolSource {
    fn kind(&self) -> Kind {
        Kind::Mcp
    }

    async fn can_execute(&self, name: &str) -> bool {
        if self.ensure_discovered().await.is_err() {
            return false;
        }
        self.discovered
            .read()
            .await
            .as_ref()
            .map(|names| names.contains_key(name))
            .unwrap_or(false)
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let arguments: Value = match serde_json::from_str(&call.arguments) {
            Ok(value) => value,
            Err(e) => {
                return ToolResult::error(
                    call.id.clone(),
                    format!("MCP tool call error: invalid arguments json: {e}"),
                )
            }
        };

        if self.ensure_discovered().await.is_err() {
            return ToolResult::error(
                call.id.clone(),
                "MCP tool call error: discovery failed".to_string(),
            );
        }

        let server_index = {
            let guard = self.discovered.read().await;
            match guard.as_ref().and_then(|names| names.get(&call.name)).copied() {
                Some(index) => index,
                None => {
                    return ToolResult::error(
                        call.id.clone(),
                        format!("MCP tool call error: unknown tool {:?}", call.name),
                    )
                }
            }
        };

        match self.call_tool(server_index, &call.name, arguments).await {
            Ok(result) => {
                let text = result
                    .content
                    .iter()
                    .filter_map(|block| block.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("\n");
                ToolResult {
                    call_id: call.id.clone(),
                    output: text,
                    is_error: result.is_error,
                }
            }
            // Connection-level errors never become engine faults (spec §4.5).
            Err(err) => ToolResult::error(call.id.clone(), format!("MCP tool call error: {err}")),
        }
    }
}
