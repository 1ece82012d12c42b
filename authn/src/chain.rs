//! `Authenticator` contract and the `AuthChain` composition (spec §4.4).

use crate::request::AuthRequest;
use async_trait::async_trait;
use protocol::{ApiError, Identity};

/// Outcome of one authenticator's evaluation. `Abstain` means "these
/// credentials are not of my kind" (wrong scheme, missing header) — not a
/// failure, just a pass to the next link in the chain.
pub enum Decision {
    Yes(Identity),
    No(ApiError),
    Abstain,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &AuthRequest) -> Decision;
}

/// What happens when every authenticator in the chain abstains.
#[derive(Clone, Copy, Debug)]
pub enum DefaultDecision {
    AllowAnonymous,
    Deny,
}

/// Evaluates authenticators in order, stopping at the first non-`Abstain`
/// decision; falls back to `DefaultDecision` if all abstain (spec §4.4).
pub struct AuthChain {
    authenticators: Vec<Box<dyn Authenticator>>,
    default_decision: DefaultDecision,
}

impl AuthChain {
    pub fn new(default_decision: DefaultDecision) -> Self {
        Self {
            authenticators: Vec::new(),
            default_decision,
        }
    }

    pub fn push(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.authenticators.push(Box::new(authenticator));
        self
    }

    /// Evaluates the chain to a final `Yes`/`No`, collapsing `Abstain` per
    /// `default_decision` if nothing in the chain committed to a decision.
    pub async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, ApiError> {
        for authenticator in &self.authenticators {
            match authenticator.authenticate(request).await {
                Decision::Yes(identity) => return validate_identity(identity),
                Decision::No(err) => return Err(err),
                Decision::Abstain => continue,
            }
        }

        match self.default_decision {
            DefaultDecision::AllowAnonymous => Ok(Identity::anonymous()),
            DefaultDecision::Deny => Err(ApiError::new(
                protocol::ApiErrorType::Authentication,
                "no authenticator accepted the request",
            )),
        }
    }
}

/// Spec §4.4 middleware step 3: an authenticator returning `Yes` with an
/// empty `subject` is a bug, surfaced as a server error rather than a 401.
fn validate_identity(identity: Identity) -> Result<Identity, ApiError> {
    if identity.subject.trim().is_empty() {
        return Err(ApiError::server_error(
            "authenticator returned Yes with an empty subject",
        ));
    }
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::ApiErrorType;

    struct AlwaysAbstain;
    #[async_trait]
    impl Authenticator for AlwaysAbstain {
        async fn authenticate(&self, _request: &AuthRequest) -> Decision {
            Decision::Abstain
        }
    }

    struct AlwaysYes(&'static str);
    #[async_trait]
    impl Authenticator for AlwaysYes {
        async fn authenticate(&self, _request: &AuthRequest) -> Decision {
            Decision::Yes(Identity {
                subject: self.0.to_string(),
                ..Identity::anonymous()
            })
        }
    }

    struct AlwaysNo;
    #[async_trait]
    impl Authenticator for AlwaysNo {
        async fn authenticate(&self, _request: &AuthRequest) -> Decision {
            Decision::No(ApiError::new(ApiErrorType::Authentication, "bad credentials"))
        }
    }

    struct BuggyYes;
    #[async_trait]
    impl Authenticator for BuggyYes {
        async fn authenticate(&self, _request: &AuthRequest) -> Decision {
            Decision::Yes(Identity {
                subject: String::new(),
                ..Identity::anonymous()
            })
        }
    }

    #[tokio::test]
    async fn first_non_abstain_wins() {
        let chain = AuthChain::new(DefaultDecision::Deny)
            .push(AlwaysAbstain)
            .push(AlwaysYes("alice"))
            .push(AlwaysNo);
        let identity = chain.authenticate(&AuthRequest::new("/v1/responses")).await.unwrap();
        assert_eq!(identity.subject, "alice");
    }

    #[tokio::test]
    async fn all_abstain_falls_back_to_default_allow() {
        let chain = AuthChain::new(DefaultDecision::AllowAnonymous).push(AlwaysAbstain);
        let identity = chain.authenticate(&AuthRequest::new("/v1/responses")).await.unwrap();
        assert_eq!(identity.subject, "anonymous");
    }

    #[tokio::test]
    async fn all_abstain_falls_back_to_default_deny() {
        let chain = AuthChain::new(DefaultDecision::Deny).push(AlwaysAbstain);
        let err = chain.authenticate(&AuthRequest::new("/v1/responses")).await.unwrap_err();
        assert_eq!(err.error_type, ApiErrorType::Authentication);
    }

    #[tokio::test]
    async fn no_decision_maps_to_error() {
        let chain = AuthChain::new(DefaultDecision::AllowAnonymous).push(AlwaysNo);
        let err = chain.authenticate(&AuthRequest::new("/v1/responses")).await.unwrap_err();
        assert_eq!(err.error_type, ApiErrorType::Authentication);
    }

    #[tokio::test]
    async fn empty_subject_is_a_server_error_not_a_401() {
        let chain = AuthChain::new(DefaultDecision::Deny).push(BuggyYes);
        let err = chain.authenticate(&AuthRequest::new("/v1/responses")).await.unwrap_err();
        assert_eq!(err.error_type, ApiErrorType::ServerError);
    }
}
