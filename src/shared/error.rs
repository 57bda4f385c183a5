//! Shared Error Types
//!
//! This module defines error types for the wire codec and message
//! validation. They are produced by code shared between the session reader
//! loop and the HTTP handlers.
//!
//! # Error Categories
//!
//! - `SerializationError` - JSON encoding/decoding failures (malformed frames)
//! - `ValidationError` - a field failed validation (e.g. blank content)
//!
//! # Usage
//!
//! ```rust
//! use chathub::shared::error::SharedError;
//!
//! let error = SharedError::validation("content", "Message content cannot be empty");
//! ```
use thiserror::Error;

/// Errors raised by the wire codec and message validation
#[derive(Debug, Error, Clone)]
pub enum SharedError {
    /// JSON serialization or deserialization error
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Human-readable error message
        message: String,
    },

    /// Data validation error
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },
}

impl SharedError {
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Text safe to send back to the client in an `error` envelope
    ///
    /// Validation messages are shown verbatim; decode details stay in the
    /// server log.
    pub fn client_reason(&self) -> String {
        match self {
            Self::ValidationError { message, .. } => message.clone(),
            Self::SerializationError { .. } => crate::shared::envelope::PROCESSING_FAILED.to_string(),
        }
    }
}

impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}
