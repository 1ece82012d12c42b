//! OAuth client-credentials token cache for MCP servers (spec §4.5):
//! proactive refresh at 80% of lifetime, mutex-serialized so concurrent
//! callers share one refresh, stale-but-valid token served if refresh fails.

use crate::error::ToolSourceError;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);
const PROACTIVE_REFRESH_FRACTION: f64 = 0.8;
/// MCP OAuth token endpoint timeout, fixed at 10s (spec §5).
const TOKEN_ENDPOINT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct OAuthConfig {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub scope: Option<String>,
}

#[derive(Clone, Debug)]
struct CachedToken {
    access_token: String,
    fetched_at: Instant,
    lifetime: Duration,
}

impl CachedToken {
    fn age(&self, now: Instant) -> Duration {
        now.duration_since(self.fetched_at)
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.age(now) >= self.lifetime
    }

    fn needs_proactive_refresh(&self, now: Instant) -> bool {
        self.age(now).as_secs_f64() >= self.lifetime.as_secs_f64() * PROACTIVE_REFRESH_FRACTION
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Fetches and caches client-credentials tokens for one MCP server.
pub struct OAuthTokenCache {
    config: OAuthConfig,
    http: reqwest::Client,
    state: Mutex<Option<CachedToken>>,
}

impl OAuthTokenCache {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::builder()
                .timeout(TOKEN_ENDPOINT_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            state: Mutex::new(None),
        }
    }

    /// Returns a valid access token, refreshing proactively at 80% of
    /// lifetime. Holding the mutex across the refresh call is what makes
    /// concurrent callers share a single in-flight refresh (P8).
    pub async fn token(&self) -> Result<String, ToolSourceError> {
        self.token_at(Instant::now()).await
    }

    /// Same as [`token`](Self::token) with an injectable clock, so tests can
    /// exercise proactive refresh (S7) without sleeping in real time.
    async fn token_at(&self, now: Instant) -> Result<String, ToolSourceError> {
        let mut state = self.state.lock().await;

        match &*state {
            Some(cached) if !cached.needs_proactive_refresh(now) => Ok(cached.access_token.clone()),
            Some(cached) => match self.fetch(now).await {
                Ok(fresh) => {
                    let token = fresh.access_token.clone();
                    *state = Some(fresh);
                    Ok(token)
                }
                Err(_) if !cached.is_expired(now) => Ok(cached.access_token.clone()),
                Err(err) => Err(err),
            },
            None => {
                let fresh = self.fetch(now).await?;
                let token = fresh.access_token.clone();
                *state = Some(fresh);
                Ok(token)
            }
        }
    }

    async fn fetch(&self, now: Instant) -> Result<CachedToken, ToolSourceError> {
        let mut form = vec![
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        if let Some(scope) = &self.config.scope {
            form.push(("scope", scope.as_str()));
        }

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ToolSourceError::Transport(format!("oauth token request failed: {e}")))?;

        let parsed: TokenResponse = response
            .json()
            .await
            .map_err(|e| ToolSourceError::Transport(format!("oauth token response invalid: {e}")))?;

        Ok(CachedToken {
            access_token: parsed.access_token,
            fetched_at: now,
            lifetime: parsed
                .expires_in
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_LIFETIME),
        })
    }
}
