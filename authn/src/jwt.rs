//! OIDC-style JWT authenticator: issuer/audience validation with a JWKS
//! cache refreshed on its own TTL, and scope extraction tolerant of either
//! a space-separated string or a JSON array claim shape (spec §4.4).

use crate::chain::{Authenticator, Decision};
use crate::request::AuthRequest;
use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use protocol::{ApiError, ApiErrorType, Identity};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    pub jwks_url: String,
    pub jwks_ttl: Duration,
}

/// Tolerates both `"scope": "a b c"` and `"scope": ["a", "b", "c"]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScopeClaim {
    Spaced(String),
    List(Vec<String>),
}

impl ScopeClaim {
    fn into_scopes(self) -> Vec<String> {
        match self {
            ScopeClaim::Spaced(s) => s.split_whitespace().map(str::to_string).collect(),
            ScopeClaim::List(list) => list,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    scope: Option<ScopeClaim>,
    #[serde(default)]
    tenant_id: Option<String>,
}

struct JwksState {
    set: Option<JwkSet>,
    fetched_at: Option<Instant>,
}

/// Verifies bearer tokens as OIDC JWTs against a cached JWKS document.
pub struct JwtAuthenticator {
    config: JwtConfig,
    http: reqwest::Client,
    cache: RwLock<JwksState>,
}

impl JwtAuthenticator {
    pub fn new(config: JwtConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            cache: RwLock::new(JwksState {
                set: None,
                fetched_at: None,
            }),
        }
    }

    async fn jwks(&self) -> Result<JwkSet, ApiError> {
        let is_stale = {
            let state = self.cache.read().await;
            match state.fetched_at {
                Some(fetched_at) => fetched_at.elapsed() >= self.config.jwks_ttl,
                None => true,
            }
        };

        if is_stale {
            let response = self
                .http
                .get(&self.config.jwks_url)
                .send()
                .await
                .map_err(|e| ApiError::new(ApiErrorType::Upstream, format!("jwks fetch failed: {e}")))?;
            let set: JwkSet = response
                .json()
                .await
                .map_err(|e| ApiError::new(ApiErrorType::Upstream, format!("jwks parse failed: {e}")))?;

            let mut state = self.cache.write().await;
            state.set = Some(set);
            state.fetched_at = Some(Instant::now());
        }

        let state = self.cache.read().await;
        state
            .set
            .clone()
            .ok_or_else(|| ApiError::new(ApiErrorType::ServerError, "jwks cache unexpectedly empty"))
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Decision {
        let Some(token) = request.bearer_token() else {
            return Decision::Abstain;
        };

        let header = match decode_header(token) {
            Ok(header) => header,
            // Not a well-formed JWT at all; let another authenticator try.
            Err(_) => return Decision::Abstain,
        };
        let Some(kid) = header.kid else {
            return Decision::No(ApiError::new(ApiErrorType::Authentication, "jwt missing kid"));
        };

        let jwks = match self.jwks().await {
            Ok(jwks) => jwks,
            Err(err) => return Decision::No(err),
        };
        let Some(jwk) = jwks.find(&kid) else {
            return Decision::No(ApiError::new(
                ApiErrorType::Authentication,
                format!("no jwk found for kid {kid:?}"),
            ));
        };
        let decoding_key = match DecodingKey::from_jwk(jwk) {
            Ok(key) => key,
            Err(e) => {
                return Decision::No(ApiError::new(
                    ApiErrorType::ServerError,
                    format!("invalid jwk: {e}"),
                ))
            }
        };

        let mut validation = Validation::new(header.alg.unwrap_or(Algorithm::RS256));
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);

        let claims = match decode::<Claims>(token, &decoding_key, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                return Decision::No(ApiError::new(
                    ApiErrorType::Authentication,
                    format!("jwt validation failed: {e}"),
                ))
            }
        };

        let mut metadata = HashMap::new();
        if let Some(tenant_id) = claims.tenant_id {
            metadata.insert("tenant_id".to_string(), tenant_id);
        }

        Decision::Yes(Identity {
            subject: claims.sub,
            service_tier: None,
            scopes: claims.scope.map(ScopeClaim::into_scopes).unwrap_or_default(),
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_claim_tolerates_space_separated_string() {
        let claim: ScopeClaim = serde_json::from_str("\"a b c\"").unwrap();
        assert_eq!(claim.into_scopes(), vec!["a", "b", "c"]);
    }

    #[test]
    fn scope_claim_tolerates_json_array() {
        let claim: ScopeClaim = serde_json::from_str("[\"a\", \"b\"]").unwrap();
        assert_eq!(claim.into_scopes(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn malformed_token_abstains_rather_than_rejects() {
        let authenticator = JwtAuthenticator::new(JwtConfig {
            issuer: "https://issuer.example".to_string(),
            audience: "gateway".to_string(),
            jwks_url: "https://issuer.example/.well-known/jwks.json".to_string(),
            jwks_ttl: Duration::from_secs(300),
        });
        let request = AuthRequest::new("/v1/responses").with_header("Authorization", "Bearer not-a-jwt");
        assert!(matches!(
            authenticator.authenticate(&request).await,
            Decision::Abstain
        ));
    }

    #[tokio::test]
    async fn missing_bearer_token_abstains() {
        let authenticator = JwtAuthenticator::new(JwtConfig {
            issuer: "https://issuer.example".to_string(),
            audience: "gateway".to_string(),
            jwks_url: "https://issuer.example/.well-known/jwks.json".to_string(),
            jwks_ttl: Duration::from_secs(300),
        });
        let request = AuthRequest::new("/v1/responses");
        assert!(matches!(
            authenticator.authenticate(&request).await,
            Decision::Abstain
        ));
    }
}
