//! Process-wide gateway configuration (spec §6.3).
//!
//! Precedence, lowest to highest: struct defaults → YAML file (explicit path,
//! else `ANTWORT_CONFIG` env var, else `./config.yaml`, else
//! `/etc/antwort/config.yaml`) → environment variable overrides → `_file`
//! references (read the named file, trim whitespace, fill the paired value
//! field unless it is already set). Nothing below the environment-override
//! layer about for running: a deployment with no file and no env vars still
//! gets sane defaults (in-memory store, no auth, `vllm` provider against
//! `http://localhost:8000`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod env_override;
mod file_refs;

pub use env_override::apply_env_overrides;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: PathBuf, source: serde_yaml::Error },
    #[error("failed to read _file reference {path}: {source}")]
    FileRef { path: String, source: std::io::Error },
    #[error("invalid environment override {key}={value}: {message}")]
    EnvOverride { key: String, value: String, message: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub engine: EngineSection,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub mcp: McpConfig,
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            engine: EngineSection::default(),
            storage: StorageConfig::default(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
            mcp: McpConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080, read_timeout_secs: 30, write_timeout_secs: 120 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendProviderKind {
    Vllm,
    Litellm,
    VllmResponses,
}

impl Default for BackendProviderKind {
    fn default() -> Self {
        BackendProviderKind::Vllm
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub provider: BackendProviderKind,
    pub backend_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    pub max_turns: u32,
    pub max_parallel_tools: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            provider: BackendProviderKind::default(),
            backend_url: "http://localhost:8000".to_string(),
            api_key: None,
            api_key_file: None,
            default_model: None,
            max_turns: 10,
            max_parallel_tools: 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    Memory,
    Postgres,
}

impl Default for StorageKind {
    fn default() -> Self {
        StorageKind::Memory
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    #[serde(rename = "type")]
    pub kind: StorageKind,
    pub max_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postgres: Option<PostgresConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { kind: StorageKind::default(), max_size: 10_000, postgres: None }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dsn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dsn_file: Option<String>,
    pub max_conns: u32,
    pub migrate_on_start: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthKind {
    None,
    Apikey,
    Jwt,
}

impl Default for AuthKind {
    fn default() -> Self {
        AuthKind::None
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    #[serde(rename = "type")]
    pub kind: AuthKind,
    pub api_keys: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt: Option<JwtSection>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { kind: AuthKind::default(), api_keys: vec![], jwt: None }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks_url: Option<String>,
    pub user_claim: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_claim: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes_claim: Option<String>,
    pub cache_ttl_secs: u64,
}

/// Sliding-window per-subject rate limits (spec §4.4). `default_rpm <= 0`
/// leaves the limiter disabled, which is also the zero-config default: a
/// deployment that never sets this section allows unlimited requests.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub default_rpm: i64,
    pub tiers: std::collections::HashMap<String, i64>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { default_rpm: 0, tiers: std::collections::HashMap::new() }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    pub servers: Vec<McpServerConfig>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct McpServerConfig {
    pub name: String,
    pub transport: String,
    pub url: String,
    pub headers: std::collections::HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<McpAuthConfig>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct McpAuthConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret_file: Option<String>,
    pub scopes: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics: MetricsConfig,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { metrics: MetricsConfig::default() }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true, path: "/metrics".to_string() }
    }
}

/// Locates the YAML config file per spec §6.3's discovery order, without
/// reading it.
pub fn discover_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var("ANTWORT_CONFIG") {
        return Some(PathBuf::from(path));
    }
    let cwd_default = PathBuf::from("./config.yaml");
    if cwd_default.is_file() {
        return Some(cwd_default);
    }
    let etc_default = PathBuf::from("/etc/antwort/config.yaml");
    if etc_default.is_file() {
        return Some(etc_default);
    }
    None
}

impl GatewayConfig {
    /// Loads configuration per the precedence documented on this module: YAML
    /// file (if found) is deserialized over the struct defaults via serde's
    /// own `#[serde(default)]` merge, environment overrides are applied next,
    /// then `_file` references are resolved last so they can fill in whatever
    /// neither the file nor the environment set.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match discover_config_path(explicit_path) {
            Some(path) => {
                let contents = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Read { path: path.clone(), source })?;
                serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })?
            }
            None => {
                tracing::debug!("no config file found, starting from defaults");
                GatewayConfig::default()
            }
        };

        env_override::apply_env_overrides(&mut config)?;
        file_refs::resolve_file_refs(&mut config)?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane_with_no_file_and_no_env() {
        let config = GatewayConfig::load(Some(Path::new("/nonexistent/path/config.yaml")));
        // an explicit path that doesn't exist is a hard error, not a fallback
        assert!(config.is_err());
    }

    #[test]
    fn absent_explicit_path_falls_back_to_defaults_when_nothing_discovered() {
        let prev = std::env::var("ANTWORT_CONFIG").ok();
        std::env::remove_var("ANTWORT_CONFIG");
        let config = GatewayConfig::load(None).expect("defaults always load");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage.kind, StorageKind::Memory);
        if let Some(prev) = prev {
            std::env::set_var("ANTWORT_CONFIG", prev);
        }
    }

    #[test]
    fn yaml_file_overrides_defaults_for_keys_it_sets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "server:\n  port: 9090\nengine:\n  backend_url: http://backend.internal:9000\n",
        )
        .unwrap();

        let config = GatewayConfig::load(Some(&path)).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.engine.backend_url, "http://backend.internal:9000");
        // untouched keys keep their defaults
        assert_eq!(config.engine.max_turns, 10);
    }

    #[test]
    fn partial_yaml_section_keeps_sibling_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "storage:\n  max_size: 500\n").unwrap();

        let config = GatewayConfig::load(Some(&path)).unwrap();
        assert_eq!(config.storage.max_size, 500);
        assert_eq!(config.storage.kind, StorageKind::Memory);
    }
}
