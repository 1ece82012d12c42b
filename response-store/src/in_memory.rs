//! In-memory `ResponseStore` reference implementation (spec §4.3). Mirrors
//! the teacher's `InMemoryStore`: a single `RwLock<HashMap>` guarding the
//! whole table, read methods taking the shared-read lock form.

use crate::error::StoreError;
use crate::store::{ItemList, ResponseList, ResponseStore, StoreContext};
use async_trait::async_trait;
use protocol::{Item, ListOptions, Response, ResponseId, SortOrder};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

struct StoredRow {
    response: Response,
    input_items: Vec<Item>,
    tenant: String,
}

struct Inner {
    rows: HashMap<ResponseId, StoredRow>,
    /// Insertion order, oldest first; used for least-recently-saved eviction.
    insertion_order: VecDeque<ResponseId>,
}

/// In-memory `ResponseStore`. Not persistent; bounded by `max_size` entries
/// with least-recently-saved eviction when `max_size > 0` (spec §4.3).
pub struct InMemoryResponseStore {
    inner: Arc<RwLock<Inner>>,
    max_size: usize,
}

impl InMemoryResponseStore {
    pub fn new(max_size: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                rows: HashMap::new(),
                insertion_order: VecDeque::new(),
            })),
            max_size,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    fn row_visible(row: &StoredRow, ctx: &StoreContext, include_deleted: bool) -> bool {
        if !include_deleted && row.response.deleted_at.is_some() {
            return false;
        }
        if ctx.scoping_enabled() && row.tenant != ctx.tenant {
            return false;
        }
        true
    }
}

impl Default for InMemoryResponseStore {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[async_trait]
impl ResponseStore for InMemoryResponseStore {
    async fn save_response(
        &self,
        ctx: &StoreContext,
        response: Response,
        input_items: Vec<Item>,
    ) -> Result<(), StoreError> {
        let id = response.id.clone();
        let mut guard = self.inner.write().await;

        if guard.rows.contains_key(&id) {
            return Err(StoreError::Conflict(format!(
                "response {id} already exists"
            )));
        }

        if self.max_size > 0 && guard.rows.len() >= self.max_size {
            if let Some(oldest) = guard.insertion_order.pop_front() {
                guard.rows.remove(&oldest);
            }
        }

        guard.rows.insert(
            id.clone(),
            StoredRow {
                response,
                input_items,
                tenant: ctx.tenant.clone(),
            },
        );
        guard.insertion_order.push_back(id);
        Ok(())
    }

    async fn get_response(&self, ctx: &StoreContext, id: &ResponseId) -> Result<Response, StoreError> {
        let guard = self.inner.read().await;
        match guard.rows.get(id) {
            Some(row) if Self::row_visible(row, ctx, false) => Ok(row.response.clone()),
            _ => Err(StoreError::NotFound),
        }
    }

    async fn get_response_for_chain(
        &self,
        ctx: &StoreContext,
        id: &ResponseId,
    ) -> Result<Response, StoreError> {
        let guard = self.inner.read().await;
        match guard.rows.get(id) {
            Some(row) if Self::row_visible(row, ctx, true) => Ok(row.response.clone()),
            _ => Err(StoreError::NotFound),
        }
    }

    async fn delete_response(&self, ctx: &StoreContext, id: &ResponseId) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        match guard.rows.get_mut(id) {
            Some(row) if Self::row_visible(row, ctx, false) => {
                row.response.deleted_at = Some(chrono::Utc::now());
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }

    async fn list_responses(
        &self,
        ctx: &StoreContext,
        options: ListOptions,
    ) -> Result<ResponseList, StoreError> {
        let guard = self.inner.read().await;
        let mut rows: Vec<&Response> = guard
            .rows
            .values()
            .filter(|row| Self::row_visible(row, ctx, false))
            .filter(|row| {
                options
                    .model
                    .as_deref()
                    .map(|model| row.response.model == model)
                    .unwrap_or(true)
            })
            .map(|row| &row.response)
            .collect();

        rows.sort_by(|a, b| {
            let by_time = a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id));
            match options.order {
                SortOrder::Asc => by_time,
                SortOrder::Desc => by_time.reverse(),
            }
        });

        let start = match &options.after {
            Some(after) => rows
                .iter()
                .position(|r| &r.id == after)
                .map(|pos| pos + 1)
                .unwrap_or(0),
            None => 0,
        };
        let end = match &options.before {
            Some(before) => rows.iter().position(|r| &r.id == before).unwrap_or(rows.len()),
            None => rows.len(),
        };
        let window = if start < end { &rows[start..end] } else { &[] };

        let limit = options.limit_or_default(20, 100) as usize;
        let has_more = window.len() > limit;
        let responses = window.iter().take(limit).map(|r| (*r).clone()).collect();

        Ok(ResponseList { responses, has_more })
    }

    async fn get_input_items(
        &self,
        ctx: &StoreContext,
        response_id: &ResponseId,
        options: ListOptions,
    ) -> Result<ItemList, StoreError> {
        let guard = self.inner.read().await;
        let row = guard
            .rows
            .get(response_id)
            .filter(|row| Self::row_visible(row, ctx, false))
            .ok_or(StoreError::NotFound)?;

        // Input arrays preserve insertion order (spec §3.3 invariant 6);
        // cursor positions index into that order directly, never re-sorted.
        let items = &row.input_items;
        let start = match &options.after {
            Some(after) => items
                .iter()
                .position(|item| &item.id == after)
                .map(|pos| pos + 1)
                .unwrap_or(0),
            None => 0,
        };
        let end = match &options.before {
            Some(before) => items.iter().position(|item| &item.id == before).unwrap_or(items.len()),
            None => items.len(),
        };
        let window = if start < end { &items[start..end] } else { &[] };

        let limit = options.limit_or_default(20, 100) as usize;
        let has_more = window.len() > limit;
        let items = window.iter().take(limit).cloned().collect();

        Ok(ItemList { items, has_more })
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{ItemPayload, ResponseStatus, ToolChoice, Usage};

    fn sample_response(model: &str) -> Response {
        Response {
            id: ResponseId::new(),
            status: ResponseStatus::Completed,
            created_at: chrono::Utc::now(),
            previous_response_id: None,
            model: model.to_string(),
            instructions: None,
            tools: vec![],
            tool_choice: ToolChoice::default(),
            temperature: None,
            top_p: None,
            max_output_tokens: None,
            usage: Usage::default(),
            output: vec![],
            incomplete_reason: None,
            required_action: None,
            error: None,
            deleted_at: None,
            metadata: Default::default(),
            extensions: Default::default(),
        }
    }

    /// **S4 — LRU eviction**: max_size=3, save a,b,c,d; a is evicted.
    #[tokio::test]
    async fn lru_eviction_drops_oldest_entry() {
        let store = InMemoryResponseStore::new(3);
        let ctx = StoreContext::single_tenant();

        let a = sample_response("gpt-test");
        let b = sample_response("gpt-test");
        let c = sample_response("gpt-test");
        let d = sample_response("gpt-test");
        let (a_id, b_id, c_id, d_id) = (a.id.clone(), b.id.clone(), c.id.clone(), d.id.clone());

        store.save_response(&ctx, a, vec![]).await.unwrap();
        store.save_response(&ctx, b, vec![]).await.unwrap();
        store.save_response(&ctx, c, vec![]).await.unwrap();
        store.save_response(&ctx, d, vec![]).await.unwrap();

        assert!(matches!(
            store.get_response(&ctx, &a_id).await,
            Err(StoreError::NotFound)
        ));
        assert!(store.get_response(&ctx, &b_id).await.is_ok());
        assert!(store.get_response(&ctx, &c_id).await.is_ok());
        assert!(store.get_response(&ctx, &d_id).await.is_ok());
    }

    #[tokio::test]
    async fn saving_duplicate_id_is_conflict() {
        let store = InMemoryResponseStore::unbounded();
        let ctx = StoreContext::single_tenant();
        let response = sample_response("gpt-test");
        let duplicate = response.clone();

        store.save_response(&ctx, response, vec![]).await.unwrap();
        let err = store.save_response(&ctx, duplicate, vec![]).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn deleted_response_excluded_from_get_but_visible_for_chain() {
        let store = InMemoryResponseStore::unbounded();
        let ctx = StoreContext::single_tenant();
        let response = sample_response("gpt-test");
        let id = response.id.clone();

        store.save_response(&ctx, response, vec![]).await.unwrap();
        store.delete_response(&ctx, &id).await.unwrap();

        assert!(matches!(
            store.get_response(&ctx, &id).await,
            Err(StoreError::NotFound)
        ));
        assert!(store.get_response_for_chain(&ctx, &id).await.is_ok());
    }

    #[tokio::test]
    async fn cross_tenant_access_is_denied() {
        let store = InMemoryResponseStore::unbounded();
        let tenant_a = StoreContext::for_tenant("tenant-a");
        let tenant_b = StoreContext::for_tenant("tenant-b");
        let response = sample_response("gpt-test");
        let id = response.id.clone();

        store.save_response(&tenant_a, response, vec![]).await.unwrap();

        assert!(store.get_response(&tenant_a, &id).await.is_ok());
        assert!(matches!(
            store.get_response(&tenant_b, &id).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn list_responses_sorts_desc_by_default_with_id_tiebreak() {
        let store = InMemoryResponseStore::unbounded();
        let ctx = StoreContext::single_tenant();

        let mut ids = vec![];
        for _ in 0..5 {
            let response = sample_response("gpt-test");
            ids.push(response.id.clone());
            store.save_response(&ctx, response, vec![]).await.unwrap();
        }

        let list = store
            .list_responses(&ctx, ListOptions::default())
            .await
            .unwrap();
        assert_eq!(list.responses.len(), 5);
        assert!(!list.has_more);
    }

    #[tokio::test]
    async fn list_responses_filters_by_model() {
        let store = InMemoryResponseStore::unbounded();
        let ctx = StoreContext::single_tenant();

        store
            .save_response(&ctx, sample_response("gpt-a"), vec![])
            .await
            .unwrap();
        store
            .save_response(&ctx, sample_response("gpt-b"), vec![])
            .await
            .unwrap();

        let options = ListOptions {
            model: Some("gpt-a".to_string()),
            ..Default::default()
        };
        let list = store.list_responses(&ctx, options).await.unwrap();
        assert_eq!(list.responses.len(), 1);
        assert_eq!(list.responses[0].model, "gpt-a");
    }

    #[tokio::test]
    async fn get_input_items_preserves_insertion_order_and_paginates() {
        let store = InMemoryResponseStore::unbounded();
        let ctx = StoreContext::single_tenant();
        let response = sample_response("gpt-test");
        let id = response.id.clone();

        let items = vec![
            Item::user_text("first"),
            Item::user_text("second"),
            Item::user_text("third"),
        ];
        store.save_response(&ctx, response, items.clone()).await.unwrap();

        let options = ListOptions {
            limit: Some(2),
            ..Default::default()
        };
        let page = store.get_input_items(&ctx, &id, options).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.has_more);
        match &page.items[0].payload {
            ItemPayload::Message { message } => assert_eq!(message.text(), "first"),
            _ => panic!("expected message"),
        }
    }

    #[tokio::test]
    async fn health_check_and_close_are_ok() {
        let store = InMemoryResponseStore::unbounded();
        assert!(store.health_check().await.is_ok());
        assert!(store.close().await.is_ok());
    }
}
