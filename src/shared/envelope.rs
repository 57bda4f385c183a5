/**
 * Wire Envelope Codec
 *
 * This module defines the JSON envelope exchanged over the chat WebSocket
 * and the functions used to encode and decode it.
 *
 * # Server → Client
 *
 * Every outbound frame is a JSON object tagged by `type`:
 *
 * - `message` - a broadcast post (`id`, `content`, `user_id`, `username`,
 *   `created_at`, and the client's `tempId` when one was supplied)
 * - `auth_success` - sent once to verified connections (`user_id`, `username`)
 * - `connection_info` - sent once to anonymous connections (`error` carries
 *   the advisory text)
 * - `error` - a problem local to one connection (`error`)
 *
 * Fields that do not apply to a variant are omitted from the JSON.
 *
 * # Client → Server
 *
 * Clients only send `{"type":"message","content":"...","tempId":"..."}`.
 * The `tempId` is opaque to the server and is echoed back verbatim on the
 * broadcast copy so the client can reconcile its optimistic message.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::SharedError;
use crate::shared::message::{ChatMessage, Identity};

/// Advisory sent to connections that could not be verified
pub const ANONYMOUS_NOTICE: &str =
    "You are connected as an anonymous user. Authorization is required to send messages.";

/// Error sent when an anonymous connection tries to post
pub const ANONYMOUS_POST_REJECTED: &str = "Only authenticated users can send messages";

/// Error sent when a frame could not be decoded or persisted
pub const PROCESSING_FAILED: &str = "Failed to process message";

/// Outbound envelope (server → client)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// Broadcast copy of a stored post
    Message {
        id: String,
        content: String,
        user_id: i64,
        username: String,
        created_at: DateTime<Utc>,
        #[serde(rename = "tempId", default, skip_serializing_if = "Option::is_none")]
        temp_id: Option<String>,
    },
    /// First frame of a verified connection
    AuthSuccess { user_id: i64, username: String },
    /// First frame of an anonymous connection
    ConnectionInfo { error: String },
    /// Connection-local error report
    Error { error: String },
}

impl Envelope {
    /// Broadcast envelope for a stored message
    pub fn broadcast(message: &ChatMessage, temp_id: Option<String>) -> Self {
        Self::Message {
            id: message.id.clone(),
            content: message.content.clone(),
            user_id: message.user_id,
            username: message.username.clone(),
            created_at: message.created_at,
            temp_id,
        }
    }

    pub fn auth_success(identity: &Identity) -> Self {
        Self::AuthSuccess {
            user_id: identity.user_id,
            username: identity.username.clone(),
        }
    }

    pub fn connection_info(advisory: impl Into<String>) -> Self {
        Self::ConnectionInfo {
            error: advisory.into(),
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self::Error {
            error: reason.into(),
        }
    }

    /// Serialize the envelope to its JSON text form
    pub fn encode(&self) -> Result<String, SharedError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Inbound frame (client → server)
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// A post request
    Message {
        #[serde(default)]
        content: String,
        #[serde(rename = "tempId", default)]
        temp_id: Option<String>,
    },
}

impl ClientFrame {
    /// Parse one text frame received from a client
    ///
    /// Unknown `type` values and malformed JSON are both decode errors.
    pub fn decode(text: &str) -> Result<Self, SharedError> {
        Ok(serde_json::from_str(text)?)
    }
}
