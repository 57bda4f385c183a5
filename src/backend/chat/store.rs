/**
 * Message Store Contract
 *
 * This module defines the narrow interface the chat core needs from the
 * persistence layer, plus an in-memory implementation used when no database
 * is configured and in tests.
 *
 * # Contract
 *
 * - `append` persists one message and returns it with its assigned id
 * - `recent` returns up to `limit` of the newest messages, optionally only
 *   those with an id strictly lower than `before_id`, in the requested order
 *
 * Implementations must tolerate concurrent calls from every session's reader
 * loop; the chat core never serializes access to the store.
 */
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::shared::{ChatMessage, NewMessage};

/// Default number of messages returned by a history query
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// Upper bound for a single history page
pub const MAX_HISTORY_LIMIT: i64 = 100;

/// Errors returned by message store implementations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Underlying database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The call did not finish within its budget
    #[error("message store timed out after {0:?}")]
    Timeout(Duration),

    /// The store cannot serve requests (e.g. a cursor it cannot interpret)
    #[error("message store unavailable: {0}")]
    Unavailable(String),
}

/// Order in which a history page is returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryOrder {
    /// Oldest first (chat-window order)
    #[default]
    Ascending,
    /// Newest first
    Descending,
}

impl std::str::FromStr for HistoryOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            other => Err(format!("unknown history order '{}'", other)),
        }
    }
}

/// Parameters of a history query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Page size, already clamped to `1..=MAX_HISTORY_LIMIT`
    pub limit: i64,
    /// Only return messages with an id strictly below this one
    pub before_id: Option<i64>,
    pub order: HistoryOrder,
}

impl HistoryQuery {
    /// Build a query, clamping the page size into the accepted range
    pub fn new(limit: Option<i64>, before_id: Option<i64>, order: HistoryOrder) -> Self {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);
        Self {
            limit,
            // ids start at 1, so a zero cursor means "no cursor"
            before_id: before_id.filter(|id| *id > 0),
            order,
        }
    }
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self::new(None, None, HistoryOrder::default())
    }
}

/// Append/query contract the chat core depends on
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a message and return it with its store-assigned id
    async fn append(&self, message: NewMessage) -> Result<ChatMessage, StoreError>;

    /// Fetch the most recent messages matching the query
    async fn recent(&self, query: HistoryQuery) -> Result<Vec<ChatMessage>, StoreError>;
}

/// Process-local message store
///
/// Ids are sequential integers starting at 1, rendered as strings, which
/// keeps `before_id` cursors meaningful.
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    messages: Mutex<Vec<ChatMessage>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored messages
    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn append(&self, message: NewMessage) -> Result<ChatMessage, StoreError> {
        let mut messages = self.messages.lock().await;
        let id = (messages.len() + 1).to_string();
        let stored = message.into_stored(id);
        messages.push(stored.clone());
        Ok(stored)
    }

    async fn recent(&self, query: HistoryQuery) -> Result<Vec<ChatMessage>, StoreError> {
        let messages = self.messages.lock().await;
        let mut page: Vec<ChatMessage> = messages
            .iter()
            .rev()
            .filter(|m| match query.before_id {
                Some(before) => m.id.parse::<i64>().map(|id| id < before).unwrap_or(false),
                None => true,
            })
            .take(query.limit as usize)
            .cloned()
            .collect();

        if query.order == HistoryOrder::Ascending {
            page.reverse();
        }
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Identity;

    async fn seeded_store(count: usize) -> InMemoryMessageStore {
        let store = InMemoryMessageStore::new();
        for i in 1..=count {
            let draft = NewMessage::new(format!("message {}", i), Identity::new(1, "alice")).unwrap();
            store.append(draft).await.unwrap();
        }
        store
    }

    #[test]
    fn test_history_query_clamps_limit() {
        assert_eq!(HistoryQuery::new(None, None, HistoryOrder::Ascending).limit, DEFAULT_HISTORY_LIMIT);
        assert_eq!(HistoryQuery::new(Some(0), None, HistoryOrder::Ascending).limit, 1);
        assert_eq!(HistoryQuery::new(Some(10_000), None, HistoryOrder::Ascending).limit, MAX_HISTORY_LIMIT);
        assert_eq!(HistoryQuery::new(None, Some(0), HistoryOrder::Ascending).before_id, None);
    }

    #[test]
    fn test_history_order_parsing() {
        assert_eq!("asc".parse::<HistoryOrder>().unwrap(), HistoryOrder::Ascending);
        assert_eq!("DESC".parse::<HistoryOrder>().unwrap(), HistoryOrder::Descending);
        assert!("sideways".parse::<HistoryOrder>().is_err());
    }

    #[tokio::test]
    async fn test_append_assigns_sequential_ids() {
        let store = InMemoryMessageStore::new();
        let first = store
            .append(NewMessage::new("one".to_string(), Identity::new(1, "alice")).unwrap())
            .await
            .unwrap();
        let second = store
            .append(NewMessage::new("two".to_string(), Identity::new(2, "bob")).unwrap())
            .await
            .unwrap();

        assert_eq!(first.id, "1");
        assert_eq!(second.id, "2");
        assert_eq!(second.username, "bob");
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_recent_returns_newest_page_ascending() {
        let store = seeded_store(5).await;
        let page = store
            .recent(HistoryQuery::new(Some(3), None, HistoryOrder::Ascending))
            .await
            .unwrap();
        let ids: Vec<&str> = page.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "4", "5"]);
    }

    #[tokio::test]
    async fn test_recent_descending_with_cursor() {
        let store = seeded_store(5).await;
        let page = store
            .recent(HistoryQuery::new(Some(2), Some(4), HistoryOrder::Descending))
            .await
            .unwrap();
        let ids: Vec<&str> = page.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2"]);
    }

    #[tokio::test]
    async fn test_recent_on_empty_store() {
        let store = InMemoryMessageStore::new();
        assert!(store.recent(HistoryQuery::default()).await.unwrap().is_empty());
        assert!(store.is_empty().await);
    }
}
