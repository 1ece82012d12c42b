//! `previous_response_id` chain reconstruction (spec §4.7.1 preflight).

use protocol::{ApiError, Item, ListOptions, ResponseId};
use response_store::{ResponseStore, StoreContext};
use std::collections::HashSet;
use std::sync::Arc;

/// Walks `previous_response_id` backwards from `start`, collecting each
/// response's own input items followed by its accumulated output items, and
/// flattens the whole chain chronologically (oldest first).
///
/// A cycle or a missing predecessor is an `invalid_request` (spec §4.7.1).
/// Soft-deleted predecessors still participate — they are fetched via
/// `get_response_for_chain`, not `get_response`.
pub async fn reconstruct_chain(
    store: &Arc<dyn ResponseStore>,
    ctx: &StoreContext,
    start: &ResponseId,
) -> Result<Vec<Item>, ApiError> {
    let mut visited = HashSet::new();
    // Newest-first as we walk backwards; reversed before returning.
    let mut generations: Vec<(Vec<Item>, Vec<Item>)> = Vec::new();
    let mut cursor = Some(start.clone());

    while let Some(id) = cursor {
        if !visited.insert(id.clone()) {
            return Err(ApiError::invalid_request(format!(
                "previous_response_id chain contains a cycle at {id}"
            )));
        }

        let response = store
            .get_response_for_chain(ctx, &id)
            .await
            .map_err(|_| ApiError::invalid_request(format!("previous_response_id {id} does not exist")))?;

        let input_items = fetch_all_input_items(store, ctx, &id).await?;
        generations.push((input_items, response.output.clone()));
        cursor = response.previous_response_id;
    }

    let mut flattened = Vec::new();
    for (input_items, output_items) in generations.into_iter().rev() {
        flattened.extend(input_items);
        flattened.extend(output_items);
    }
    Ok(flattened)
}

/// `get_input_items` is cursor-paginated (default page size 20, max 100);
/// chain reconstruction needs the complete, unpaginated list, so this pages
/// through until the store reports no more rows.
async fn fetch_all_input_items(
    store: &Arc<dyn ResponseStore>,
    ctx: &StoreContext,
    response_id: &ResponseId,
) -> Result<Vec<Item>, ApiError> {
    let mut all = Vec::new();
    let mut after = None;
    loop {
        let page = store
            .get_input_items(
                ctx,
                response_id,
                ListOptions {
                    after: after.clone(),
                    limit: Some(100),
                    ..ListOptions::default()
                },
            )
            .await
            .map_err(ApiError::from)?;
        let has_more = page.has_more;
        after = page.items.last().map(|item| item.id.clone());
        all.extend(page.items);
        if !has_more || after.is_none() {
            break;
        }
    }
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{CreateResponseRequest, Input, Item as ProtoItem, Response, ResponseStatus, ToolChoice, Usage};
    use response_store::InMemoryResponseStore;

    fn base_response(id: ResponseId, previous: Option<ResponseId>, output: Vec<ProtoItem>) -> Response {
        Response {
            id,
            status: ResponseStatus::Completed,
            created_at: chrono::Utc::now(),
            previous_response_id: previous,
            model: "gpt-test".to_string(),
            instructions: None,
            tools: vec![],
            tool_choice: ToolChoice::default(),
            temperature: None,
            top_p: None,
            max_output_tokens: None,
            usage: Usage::default(),
            output,
            incomplete_reason: None,
            required_action: None,
            error: None,
            deleted_at: None,
            metadata: Default::default(),
            extensions: Default::default(),
        }
    }

    fn unused_request() -> CreateResponseRequest {
        // only used to silence an unused-import warning path in some builds
        CreateResponseRequest {
            model: "gpt-test".to_string(),
            input: Input::Text("x".to_string()),
            instructions: None,
            previous_response_id: None,
            tools: vec![],
            tool_choice: None,
            allowed_tools: None,
            stream: false,
            temperature: None,
            top_p: None,
            max_output_tokens: None,
            max_turns: None,
            truncation: None,
            store: true,
            metadata: Default::default(),
            extensions: Default::default(),
        }
    }

    #[tokio::test]
    async fn flattens_a_two_generation_chain_oldest_first() {
        let _ = unused_request();
        let store: Arc<dyn ResponseStore> = Arc::new(InMemoryResponseStore::unbounded());
        let ctx = StoreContext::single_tenant();

        let root_id = ResponseId::new();
        let root_output = vec![ProtoItem::assistant_text("hi, root")];
        store
            .save_response(&ctx, base_response(root_id.clone(), None, root_output.clone()), vec![ProtoItem::user_text("root input")])
            .await
            .unwrap();

        let child_id = ResponseId::new();
        let child_output = vec![ProtoItem::assistant_text("hi, child")];
        store
            .save_response(
                &ctx,
                base_response(child_id.clone(), Some(root_id.clone()), child_output.clone()),
                vec![ProtoItem::user_text("child input")],
            )
            .await
            .unwrap();

        let flattened = reconstruct_chain(&store, &ctx, &child_id).await.unwrap();
        assert_eq!(flattened.len(), 4);
        assert_eq!(flattened[0].payload.type_name(), "message");
    }

    #[tokio::test]
    async fn missing_predecessor_is_an_invalid_request() {
        let store: Arc<dyn ResponseStore> = Arc::new(InMemoryResponseStore::unbounded());
        let ctx = StoreContext::single_tenant();
        let err = reconstruct_chain(&store, &ctx, &ResponseId::new()).await.unwrap_err();
        assert_eq!(err.error_type, protocol::ApiErrorType::InvalidRequest);
    }

    #[tokio::test]
    async fn self_referential_chain_is_rejected_as_a_cycle() {
        let store: Arc<dyn ResponseStore> = Arc::new(InMemoryResponseStore::unbounded());
        let ctx = StoreContext::single_tenant();
        let id = ResponseId::new();
        store
            .save_response(&ctx, base_response(id.clone(), Some(id.clone()), vec![]), vec![])
            .await
            .unwrap();
        let err = reconstruct_chain(&store, &ctx, &id).await.unwrap_err();
        assert_eq!(err.error_type, protocol::ApiErrorType::InvalidRequest);
    }
}
