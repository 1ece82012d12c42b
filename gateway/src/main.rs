//! Gateway process entrypoint (spec §6.3, SPEC_FULL §2 component 11): loads
//! configuration, builds the store/auth/tool/provider dependency graph, and
//! serves the OpenResponses HTTP API until SIGINT/SIGTERM.

use authn::{
    AuthChain, ApiKeyAuthenticator, ApiKeyEntry, DefaultDecision, JwtAuthenticator, JwtConfig,
    RateLimiter, RateLimiterConfig,
};
use clap::Parser;
use config::{AuthKind, BackendProviderKind, GatewayConfig, McpAuthConfig};
use engine::{Engine, EngineConfig, ToolRegistry};
use gateway_http::AppState;
use provider::{BackendProvider, OpenAiCompatibleProvider, VllmResponsesProvider};
use response_store::{InMemoryResponseStore, ResponseStore};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tools::mcp::{McpServerConfig as ToolsMcpServerConfig, McpToolSource, McpTransport, OAuthConfig};
use tools::ToolExecutor;

#[derive(Parser, Debug)]
#[command(name = "gateway")]
#[command(about = "OpenResponses-compatible agentic gateway")]
struct Args {
    /// Path to the YAML config file; overrides config discovery (spec §6.3).
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = GatewayConfig::load(args.config.as_deref())?;

    let store: Arc<dyn ResponseStore> = match config.storage.kind {
        config::StorageKind::Memory => Arc::new(InMemoryResponseStore::new(config.storage.max_size)),
        config::StorageKind::Postgres => {
            return Err("storage.type = postgres has no driver wired into this binary; \
                        a SQL-backed ResponseStore is an external collaborator (spec §1 non-goals)"
                .into());
        }
    };

    let auth_chain = build_auth_chain(&config)?;
    let rate_limiter = build_rate_limiter(&config);
    let tool_registry = build_tool_registry(&config)?;
    let backend_provider = build_backend_provider(&config);

    let engine_config = EngineConfig {
        max_turns: config.engine.max_turns,
        max_parallel_tools: config.engine.max_parallel_tools,
        default_model: config.engine.default_model.clone(),
    };
    let engine = Arc::new(Engine::new(
        Some(Arc::clone(&store)),
        tool_registry,
        Vec::new(),
        backend_provider,
        engine_config,
    ));

    let metrics_path = config.observability.metrics.path.clone();
    let auth_bypass = vec!["/healthz".to_string(), "/readyz".to_string(), metrics_path.clone()];

    let app_state = Arc::new(AppState {
        engine,
        store: Some(store),
        auth_chain: Arc::new(auth_chain),
        rate_limiter: rate_limiter.map(Arc::new),
        auth_bypass,
        management_routes: Vec::new(),
        collectors: Vec::new(),
        metrics_path,
    });

    let app = gateway_http::router(app_state);
    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        signal.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

fn build_auth_chain(config: &GatewayConfig) -> Result<AuthChain, Box<dyn std::error::Error + Send + Sync>> {
    match config.auth.kind {
        AuthKind::None => Ok(AuthChain::new(DefaultDecision::AllowAnonymous)),
        AuthKind::Apikey => {
            let mut keys = HashMap::new();
            for key in &config.auth.api_keys {
                keys.insert(
                    key.clone(),
                    ApiKeyEntry { subject: key.clone(), tenant_id: None, service_tier: None, scopes: vec![] },
                );
            }
            Ok(AuthChain::new(DefaultDecision::Deny).push(ApiKeyAuthenticator::new(keys)))
        }
        AuthKind::Jwt => {
            let jwt = config.auth.jwt.clone().ok_or("auth.type = jwt requires an auth.jwt section")?;
            let jwt_config = JwtConfig {
                issuer: jwt.issuer.unwrap_or_default(),
                audience: jwt.audience.unwrap_or_default(),
                jwks_url: jwt.jwks_url.ok_or("auth.jwt.jwks_url is required")?,
                jwks_ttl: Duration::from_secs(jwt.cache_ttl_secs),
            };
            Ok(AuthChain::new(DefaultDecision::Deny).push(JwtAuthenticator::new(jwt_config)))
        }
    }
}

fn build_rate_limiter(config: &GatewayConfig) -> Option<RateLimiter> {
    let has_limits = config.rate_limit.default_rpm > 0 || config.rate_limit.tiers.values().any(|rpm| *rpm > 0);
    if !has_limits {
        return None;
    }
    Some(RateLimiter::new(RateLimiterConfig {
        tiers: config.rate_limit.tiers.clone(),
        default_rpm: config.rate_limit.default_rpm,
    }))
}

fn build_tool_registry(config: &GatewayConfig) -> Result<ToolRegistry, Box<dyn std::error::Error + Send + Sync>> {
    if config.mcp.servers.is_empty() {
        return Ok(ToolRegistry::new(Vec::new()));
    }

    let mut servers = Vec::with_capacity(config.mcp.servers.len());
    for server in &config.mcp.servers {
        let transport = match server.transport.as_str() {
            "sse" => McpTransport::Sse,
            "streamable-http" | "" => McpTransport::StreamableHttp,
            other => {
                return Err(format!("mcp server {:?}: unknown transport {:?}", server.name, other).into())
            }
        };
        servers.push(ToolsMcpServerConfig {
            name: server.name.clone(),
            url: server.url.clone(),
            transport,
            headers: server.headers.clone(),
            oauth: server.auth.as_ref().map(convert_oauth).transpose()?,
        });
    }

    let source: Arc<dyn ToolExecutor> = Arc::new(McpToolSource::new(servers));
    Ok(ToolRegistry::new(vec![source]))
}

fn convert_oauth(auth: &McpAuthConfig) -> Result<OAuthConfig, Box<dyn std::error::Error + Send + Sync>> {
    // `auth.type` is advisory: client-credentials OAuth is the only MCP auth
    // mechanism this tool subsystem implements, so any non-empty kind maps
    // to it rather than requiring a specific spelling.
    Ok(OAuthConfig {
        token_url: auth.token_url.clone().ok_or("mcp auth.token_url is required")?,
        client_id: auth.client_id.clone().ok_or("mcp auth.client_id is required")?,
        client_secret: auth.client_secret.clone().ok_or("mcp auth.client_secret is required")?,
        scope: if auth.scopes.is_empty() { None } else { Some(auth.scopes.join(" ")) },
    })
}

fn build_backend_provider(config: &GatewayConfig) -> Arc<dyn BackendProvider> {
    let api_key = config.engine.api_key.clone();
    match config.engine.provider {
        BackendProviderKind::Vllm | BackendProviderKind::Litellm => {
            Arc::new(OpenAiCompatibleProvider::new(config.engine.backend_url.clone(), api_key))
        }
        BackendProviderKind::VllmResponses => {
            Arc::new(VllmResponsesProvider::new(config.engine.backend_url.clone(), api_key))
        }
    }
}
