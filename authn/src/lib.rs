//! Authentication chain, built-in authenticators, and the sliding-window
//! rate limiter (spec §4.4). Transport-agnostic: the HTTP adapter crate
//! builds an `AuthRequest` from its own framework types and calls
//! [`pipeline::authenticate_and_rate_limit`].

pub mod api_key;
pub mod chain;
pub mod jwt;
pub mod pipeline;
pub mod rate_limiter;
pub mod request;

pub use api_key::{ApiKeyAuthenticator, ApiKeyEntry};
pub use chain::{AuthChain, Authenticator, Decision, DefaultDecision};
pub use jwt::{JwtAuthenticator, JwtConfig};
pub use pipeline::{authenticate_and_rate_limit, is_bypassed};
pub use rate_limiter::{RateLimiter, RateLimiterConfig};
pub use request::AuthRequest;
