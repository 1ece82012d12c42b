//! `code_interpreter` built-in provider (spec §4.5, §6.2): `{code, requirements?}`,
//! dispatched to a sandbox acquired via a pluggable `SandboxAcquirer`.

use crate::error::ToolSourceError;
use crate::executor::{Kind, ToolExecutor};
use crate::provider::FunctionProvider;
use async_trait::async_trait;
use protocol::{CodeInterpreterCallData, CodeInterpreterOutput, ToolCall, ToolDefinition, ToolResult, ToolType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "webp"];

/// Resolves a sandbox base URL for one execution. A static single-sandbox
/// deployment returns the same URL every time; a pooled deployment claims
/// one on demand.
#[async_trait]
pub trait SandboxAcquirer: Send + Sync {
    async fn acquire(&self) -> Result<String, ToolSourceError>;
}

pub struct StaticSandbox(pub String);

#[async_trait]
impl SandboxAcquirer for StaticSandbox {
    async fn acquire(&self) -> Result<String, ToolSourceError> {
        Ok(self.0.clone())
    }
}

#[derive(Deserialize)]
struct CodeInterpreterArgs {
    code: String,
    #[serde(default)]
    requirements: Vec<String>,
}

#[derive(Serialize)]
struct ExecuteRequest<'a> {
    code: &'a str,
    timeout_seconds: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    requirements: &'a [String],
}

#[derive(Deserialize)]
struct ExecuteResponse {
    status: String,
    stdout: String,
    stderr: String,
    #[serde(default)]
    files_produced: HashMap<String, String>,
}

pub struct CodeInterpreterProvider {
    acquirer: Box<dyn SandboxAcquirer>,
    http: reqwest::Client,
    timeout_seconds: u64,
}

impl CodeInterpreterProvider {
    pub fn new(acquirer: Box<dyn SandboxAcquirer>, timeout_seconds: u64) -> Self {
        Self {
            acquirer,
            http: reqwest::Client::new(),
            timeout_seconds,
        }
    }

    fn classify_files(files: HashMap<String, String>) -> Vec<CodeInterpreterOutput> {
        files
            .into_iter()
            .map(|(name, _base64_content)| {
                let extension = name.rsplit('.').next().unwrap_or("").to_lowercase();
                if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
                    CodeInterpreterOutput::Image {
                        file_id: format!("file_{name}"),
                    }
                } else {
                    CodeInterpreterOutput::Logs {
                        logs: format!("produced file {name}"),
                    }
                }
            })
            .collect()
    }
}

#[async_trait]
impl ToolExecutor for CodeInterpreterProvider {
    fn kind(&self) -> Kind {
        Kind::Sandbox
    }

    async fn can_execute(&self, name: &str) -> bool {
        name == "code_interpreter"
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let args: CodeInterpreterArgs = match serde_json::from_str(&call.arguments) {
            Ok(args) => args,
            Err(e) => {
                return ToolResult::error(
                    call.id.clone(),
                    format!("invalid code_interpreter arguments: {e}"),
                )
            }
        };

        let sandbox_url = match self.acquirer.acquire().await {
            Ok(url) => url,
            Err(err) => return ToolResult::error(call.id.clone(), format!("sandbox unavailable: {err}")),
        };

        let request = ExecuteRequest {
            code: &args.code,
            timeout_seconds: self.timeout_seconds,
            requirements: &args.requirements,
        };

        let response = match self
            .http
            .post(format!("{sandbox_url}/execute"))
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return ToolResult::error(call.id.clone(), format!("sandbox request failed: {e}")),
        };

        let parsed: ExecuteResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => return ToolResult::error(call.id.clone(), format!("sandbox response invalid: {e}")),
        };

        let outputs = Self::classify_files(parsed.files_produced);
        let payload = CodeInterpreterCallData {
            code: args.code,
            outputs,
        };
        let summary = serde_json::to_string(&payload).unwrap_or_default();

        if parsed.status == "success" {
            ToolResult::ok(call.id.clone(), format!("{}\n{}", parsed.stdout, summary))
        } else {
            ToolResult::error(call.id.clone(), format!("{}\n{}", parsed.stderr, summary))
        }
    }
}

#[async_trait]
impl FunctionProvider for CodeInterpreterProvider {
    fn name(&self) -> &str {
        "code_interpreter"
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            tool_type: ToolType::Function,
            name: "code_interpreter".to_string(),
            description: Some("Execute Python code in a sandbox and return its output.".to_string()),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "code": { "type": "string" },
                    "requirements": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["code"]
            }),
            strict: None,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_extensions_classify_as_image_outputs() {
        let mut files = HashMap::new();
        files.insert("plot.png".to_string(), "base64".to_string());
        let outputs = CodeInterpreterProvider::classify_files(files);
        assert!(matches!(outputs[0], CodeInterpreterOutput::Image { .. }));
    }

    #[test]
    fn non_image_extensions_classify_as_logs() {
        let mut files = HashMap::new();
        files.insert("data.csv".to_string(), "base64".to_string());
        let outputs = CodeInterpreterProvider::classify_files(files);
        assert!(matches!(outputs[0], CodeInterpreterOutput::Logs { .. }));
    }

    #[tokio::test]
    async fn static_sandbox_always_resolves_same_url() {
        let sandbox = StaticSandbox("http://sandbox.local".to_string());
        assert_eq!(sandbox.acquire().await.unwrap(), "http://sandbox.local");
        assert_eq!(sandbox.acquire().await.unwrap(), "http://sandbox.local");
    }
}
