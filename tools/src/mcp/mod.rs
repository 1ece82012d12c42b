pub mod client;
pub mod oauth;

pub use client::{McpServerConfig, McpToolSource, McpTransport};
pub use oauth::{OAuthConfig, OAuthTokenCache};
