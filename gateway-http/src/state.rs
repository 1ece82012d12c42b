//! Shared, request-scoped state handed to every route (spec §4.8, §6.3).
//! Built once at startup by the `gateway` binary and wrapped in an `Arc`.

use authn::{AuthChain, RateLimiter};
use engine::Engine;
use response_store::ResponseStore;
use std::sync::Arc;
use tools::{Collector, ManagementRoute};

pub struct AppState {
    pub engine: Arc<Engine>,
    /// Also held directly (not just inside `Engine`) so the adapter's own
    /// `GET`/`DELETE`/list routes don't need to round-trip through the
    /// engine for operations the engine itself never performs.
    pub store: Option<Arc<dyn ResponseStore>>,
    pub auth_chain: Arc<AuthChain>,
    pub rate_limiter: Option<Arc<RateLimiter>>,
    /// Paths that bypass authentication entirely (spec §4.4 step 1).
    pub auth_bypass: Vec<String>,
    /// Management routes contributed by built-in tool providers (spec §4.5),
    /// mounted under the same auth chain (spec §4.8).
    pub management_routes: Vec<Arc<dyn ManagementRoute>>,
    pub collectors: Vec<Arc<dyn Collector>>,
    pub metrics_path: String,
}
