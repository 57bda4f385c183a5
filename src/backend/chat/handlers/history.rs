/**
 * Chat History Handler
 *
 * Handles `GET /api/chat/messages`, a plain read of persisted messages.
 *
 * # Query Parameters
 *
 * - `limit` - page size, default 50, clamped to `1..=100`
 * - `before_id` - only messages with a smaller id (pagination cursor)
 *
 * The page holds the newest matching messages, ordered oldest-first unless
 * the server is configured for descending order.
 */

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::backend::chat::store::{HistoryQuery, StoreError};
use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;
use crate::shared::{ChatMessage, SharedError};

/// Raw query parameters; parsed leniently so empty values mean "unset"
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<String>,
    pub before_id: Option<String>,
}

fn parse_param(name: &str, raw: Option<&str>) -> Result<Option<i64>, SharedError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| SharedError::validation(name, format!("{} must be an integer", name))),
    }
}

/// Return a page of chat history as a JSON array
pub async fn handle_get_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<ChatMessage>>, BackendError> {
    let limit = parse_param("limit", params.limit.as_deref())?;
    let before_id = parse_param("before_id", params.before_id.as_deref())?;
    let query = HistoryQuery::new(limit, before_id, state.config.history_order);

    let budget = state.config.store_timeout;
    let messages = tokio::time::timeout(budget, state.store.recent(query))
        .await
        .map_err(|_| StoreError::Timeout(budget))??;

    tracing::debug!("[History] Returning {} messages", messages.len());
    Ok(Json(messages))
}
