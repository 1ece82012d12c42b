//! The `ResponseStore` contract (spec §4.2).

use crate::error::StoreError;
use async_trait::async_trait;
use protocol::{Item, ListOptions, Response, ResponseId};

/// Tenant scoping carried alongside every store call. An empty `tenant`
/// disables scoping (single-tenant mode); a non-empty tenant must match the
/// stored row's tenant or the row is treated as absent (spec §4.2).
#[derive(Clone, Debug, Default)]
pub struct StoreContext {
    pub tenant: String,
}

impl StoreContext {
    pub fn single_tenant() -> Self {
        Self { tenant: String::new() }
    }

    pub fn for_tenant(tenant: impl Into<String>) -> Self {
        Self { tenant: tenant.into() }
    }

    pub fn scoping_enabled(&self) -> bool {
        !self.tenant.is_empty()
    }
}

/// A page of `Response` rows plus the store's per-page cursor state.
#[derive(Clone, Debug, Default)]
pub struct ResponseList {
    pub responses: Vec<Response>,
    pub has_more: bool,
}

/// A page of `Item` rows (the input items of one response).
#[derive(Clone, Debug, Default)]
pub struct ItemList {
    pub items: Vec<Item>,
    pub has_more: bool,
}

/// Storage contract for `Response` rows and their input items (spec §4.2).
/// Every method is tenant-scoped via `StoreContext`.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Persists a new response. `ErrConflict` (mapped from `StoreError::Conflict`)
    /// if a row with the same id already exists.
    async fn save_response(
        &self,
        ctx: &StoreContext,
        response: Response,
        input_items: Vec<Item>,
    ) -> Result<(), StoreError>;

    /// Fetches a response, excluding soft-deleted rows.
    async fn get_response(&self, ctx: &StoreContext, id: &ResponseId) -> Result<Response, StoreError>;

    /// Fetches a response including soft-deleted rows, for chain walking
    /// (spec §4.7 preflight conversation reconstruction).
    async fn get_response_for_chain(
        &self,
        ctx: &StoreContext,
        id: &ResponseId,
    ) -> Result<Response, StoreError>;

    /// Soft-deletes a response: `deleted_at` is set but the row stays
    /// retrievable via `get_response_for_chain`.
    async fn delete_response(&self, ctx: &StoreContext, id: &ResponseId) -> Result<(), StoreError>;

    async fn list_responses(
        &self,
        ctx: &StoreContext,
        options: ListOptions,
    ) -> Result<ResponseList, StoreError>;

    async fn get_input_items(
        &self,
        ctx: &StoreContext,
        response_id: &ResponseId,
        options: ListOptions,
    ) -> Result<ItemList, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;

    async fn close(&self) -> Result<(), StoreError>;
}
