/**
 * PostgreSQL Message Store
 *
 * This module provides the `MessageStore` implementation backed by the
 * `messages` table in PostgreSQL.
 *
 * # Schema
 *
 * The table is created by the account/forum services' migrations and is
 * expected to look like:
 *
 * ```sql
 * CREATE TABLE messages (
 *     id         BIGSERIAL PRIMARY KEY,
 *     content    TEXT NOT NULL,
 *     user_id    BIGINT NOT NULL,
 *     username   VARCHAR(255) NOT NULL,
 *     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
 *     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
 * );
 * ```
 *
 * Ids are returned as text so the wire format does not depend on the
 * column type.
 */

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::backend::chat::store::{HistoryOrder, HistoryQuery, MessageStore, StoreError};
use crate::shared::{ChatMessage, NewMessage};

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: String,
    content: String,
    user_id: i64,
    username: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MessageRow> for ChatMessage {
    fn from(row: MessageRow) -> Self {
        ChatMessage {
            id: row.id,
            content: row.content,
            user_id: row.user_id,
            username: row.username,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Message store backed by a PostgreSQL pool
///
/// `PgPool` is internally reference counted and safe to share, so one
/// instance serves every session concurrently.
#[derive(Clone, Debug)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Check whether the `messages` table exists in the public schema
    ///
    /// # Returns
    /// `true` if the table is present, or the database error
    pub async fn messages_table_exists(&self) -> Result<bool, sqlx::Error> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT FROM information_schema.tables
                WHERE table_schema = 'public'
                AND table_name = 'messages'
            )
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    /// Insert a message and return it with the database-assigned id
    async fn append(&self, message: NewMessage) -> Result<ChatMessage, StoreError> {
        let id: String = sqlx::query_scalar(
            r#"
            INSERT INTO messages (content, user_id, username, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id::text
            "#,
        )
        .bind(&message.content)
        .bind(message.author.user_id)
        .bind(&message.author.username)
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("[Store] Appended message {} from user {}", id, message.author.user_id);

        Ok(message.into_stored(id))
    }

    /// Load the newest `limit` messages, optionally strictly before a cursor
    async fn recent(&self, query: HistoryQuery) -> Result<Vec<ChatMessage>, StoreError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id::text AS id, content, user_id, username, created_at, updated_at
            FROM messages
            WHERE ($2::BIGINT IS NULL OR id < $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(query.limit)
        .bind(query.before_id)
        .fetch_all(&self.pool)
        .await?;

        let mut messages: Vec<ChatMessage> = rows.into_iter().map(ChatMessage::from).collect();
        if query.order == HistoryOrder::Ascending {
            messages.reverse();
        }

        tracing::debug!("[Store] Loaded {} messages", messages.len());
        Ok(messages)
    }
}
