/**
 * Chat Message Data Structures
 *
 * This module defines the persisted chat message, the identity of its
 * author, and the draft that is handed to the message store before an id
 * has been assigned.
 *
 * The `ChatMessage` struct is what the history endpoint returns and what
 * the store hands back after an append. It is serialized as:
 *
 * ```json
 * {"id":"42","content":"hi","user_id":1,"username":"alice",
 *  "created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z"}
 * ```
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::SharedError;

/// Maximum number of characters accepted in a single chat post
pub const MAX_CONTENT_LENGTH: usize = 1000;

/// Identity of a verified chat participant
///
/// Returned by the identity verifier and carried by authenticated
/// sessions. Anonymous sessions have no `Identity` at all.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Identity {
    /// Numeric user id issued by the account service
    pub user_id: i64,
    /// Display name shown next to messages
    pub username: String,
}

impl Identity {
    pub fn new(user_id: i64, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

/// A persisted chat message
///
/// Messages are immutable once the store has accepted them. The `id` is
/// assigned by the store and is unique within it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    /// Store-assigned identifier
    pub id: String,
    /// Message body
    pub content: String,
    /// Author's user id
    pub user_id: i64,
    /// Author's display name
    pub username: String,
    /// Creation timestamp (RFC3339 on the wire)
    pub created_at: DateTime<Utc>,
    /// Last update timestamp; equal to `created_at` for chat messages
    pub updated_at: DateTime<Utc>,
}

/// A message that has been accepted from a client but not yet stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub content: String,
    pub author: Identity,
    pub created_at: DateTime<Utc>,
}

impl NewMessage {
    /// Build a draft from raw client content, validating it first
    ///
    /// # Errors
    ///
    /// Returns `SharedError::ValidationError` if the content is blank or
    /// longer than [`MAX_CONTENT_LENGTH`] characters.
    pub fn new(content: String, author: Identity) -> Result<Self, SharedError> {
        validate_content(&content)?;
        Ok(Self {
            content,
            author,
            created_at: Utc::now(),
        })
    }

    /// Turn the draft into a stored message once the store assigned an id
    pub fn into_stored(self, id: String) -> ChatMessage {
        ChatMessage {
            id,
            content: self.content,
            user_id: self.author.user_id,
            username: self.author.username,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Check that post content is non-blank and within the length limit
pub fn validate_content(content: &str) -> Result<(), SharedError> {
    if content.trim().is_empty() {
        return Err(SharedError::validation("content", "Message content cannot be empty"));
    }
    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(SharedError::validation(
            "content",
            format!("Message content cannot exceed {} characters", MAX_CONTENT_LENGTH),
        ));
    }
    Ok(())
}
