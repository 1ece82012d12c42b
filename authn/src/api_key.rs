//! Static API-key table authenticator (spec §4.4 built-ins).

use crate::chain::{Authenticator, Decision};
use crate::request::AuthRequest;
use async_trait::async_trait;
use protocol::Identity;
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct ApiKeyEntry {
    pub subject: String,
    pub tenant_id: Option<String>,
    pub service_tier: Option<String>,
    pub scopes: Vec<String>,
}

/// Looks up the bearer token against a static `key -> identity` table.
/// Abstains when there is no bearer token at all, so it composes cleanly
/// ahead of or behind a JWT authenticator in an `AuthChain`.
pub struct ApiKeyAuthenticator {
    keys: HashMap<String, ApiKeyEntry>,
}

impl ApiKeyAuthenticator {
    pub fn new(keys: HashMap<String, ApiKeyEntry>) -> Self {
        Self { keys }
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Decision {
        let Some(token) = request.bearer_token() else {
            return Decision::Abstain;
        };

        match self.keys.get(token) {
            Some(entry) => {
                let mut metadata = HashMap::new();
                if let Some(tenant_id) = &entry.tenant_id {
                    metadata.insert("tenant_id".to_string(), tenant_id.clone());
                }
                Decision::Yes(Identity {
                    subject: entry.subject.clone(),
                    service_tier: entry.service_tier.clone(),
                    scopes: entry.scopes.clone(),
                    metadata,
                })
            }
            None => Decision::Abstain,
        }
    }
}
