//! The per-request auth pipeline (spec §4.4 middleware steps 1-5), as a
//! transport-agnostic function. The HTTP adapter calls this once per request
//! and maps the result onto the framework's extension/context mechanism.

use crate::chain::AuthChain;
use crate::rate_limiter::RateLimiter;
use crate::request::AuthRequest;
use protocol::Identity;

/// Paths that bypass authentication entirely (spec §4.4 step 1).
pub fn is_bypassed(path: &str, allow_list: &[String]) -> bool {
    allow_list.iter().any(|allowed| allowed == path)
}

/// Runs auth + rate limiting for one request, returning the resolved
/// identity on success. The caller still owns injecting `identity` (and its
/// `tenant_id`, if any) into whatever request-scoped context it uses.
pub async fn authenticate_and_rate_limit(
    request: &AuthRequest,
    allow_list: &[String],
    chain: &AuthChain,
    rate_limiter: Option<&RateLimiter>,
) -> Result<Option<Identity>, protocol::ApiError> {
    if is_bypassed(&request.path, allow_list) {
        return Ok(None);
    }

    let identity = chain.authenticate(request).await?;

    if let Some(limiter) = rate_limiter {
        let tier = identity.service_tier.as_deref().unwrap_or("default");
        limiter.allow(&identity.subject, tier).await?;
    }

    Ok(Some(identity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::DefaultDecision;
    use crate::rate_limiter::RateLimiterConfig;

    #[test]
    fn bypassed_paths_match_exactly() {
        let allow_list = vec!["/healthz".to_string(), "/readyz".to_string()];
        assert!(is_bypassed("/healthz", &allow_list));
        assert!(!is_bypassed("/v1/responses", &allow_list));
    }

    #[tokio::test]
    async fn bypassed_path_skips_auth_entirely() {
        let chain = AuthChain::new(DefaultDecision::Deny);
        let allow_list = vec!["/healthz".to_string()];
        let request = AuthRequest::new("/healthz");
        let identity = authenticate_and_rate_limit(&request, &allow_list, &chain, None)
            .await
            .unwrap();
        assert!(identity.is_none());
    }

    #[tokio::test]
    async fn non_bypassed_path_with_default_deny_and_empty_chain_fails() {
        let chain = AuthChain::new(DefaultDecision::Deny);
        let request = AuthRequest::new("/v1/responses");
        let err = authenticate_and_rate_limit(&request, &[], &chain, None)
            .await
            .unwrap_err();
        assert_eq!(err.error_type, protocol::ApiErrorType::Authentication);
    }

    #[tokio::test]
    async fn rate_limiter_rejects_after_identity_resolves() {
        let chain = AuthChain::new(DefaultDecision::AllowAnonymous);
        let limiter = RateLimiter::new(RateLimiterConfig {
            tiers: Default::default(),
            default_rpm: 1,
        });
        let request = AuthRequest::new("/v1/responses");

        assert!(authenticate_and_rate_limit(&request, &[], &chain, Some(&limiter))
            .await
            .is_ok());
        let err = authenticate_and_rate_limit(&request, &[], &chain, Some(&limiter))
            .await
            .unwrap_err();
        assert_eq!(err.error_type, protocol::ApiErrorType::TooManyRequests);
    }
}
