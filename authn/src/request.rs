//! Transport-agnostic view of an inbound request, as seen by authenticators.
//! Kept free of any HTTP framework type so `authn` has no dependency on the
//! crate that eventually hosts the route table.

use std::collections::HashMap;

#[derive(Clone, Debug, Default)]
pub struct AuthRequest {
    pub path: String,
    /// Lower-cased header names.
    pub headers: HashMap<String, String>,
}

impl AuthRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Extracts the token from an `Authorization: Bearer <token>` header.
    pub fn bearer_token(&self) -> Option<&str> {
        self.header("authorization")?.strip_prefix("Bearer ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_strips_prefix() {
        let request = AuthRequest::new("/v1/responses").with_header("Authorization", "Bearer abc123");
        assert_eq!(request.bearer_token(), Some("abc123"));
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let request = AuthRequest::new("/v1/responses").with_header("Authorization", "Bearer abc123");
        assert_eq!(request.header("AUTHORIZATION"), Some("Bearer abc123"));
    }

    #[test]
    fn missing_header_returns_none() {
        let request = AuthRequest::new("/v1/responses");
        assert_eq!(request.bearer_token(), None);
    }
}
