/**
 * Backend Error Types
 *
 * This module defines the error type returned by the HTTP handlers.
 * Every variant maps to a status code and a client-facing message.
 *
 * # Error Categories
 *
 * ## Handler Errors
 *
 * Raised while processing a request:
 * - Credential rejected when anonymous access is disabled
 * - Origin not in the allow-list
 * - Invalid query parameters
 *
 * ## Store Errors
 *
 * Raised by the message store behind the history endpoint. Database details
 * are logged, never returned to the client.
 */

use thiserror::Error;
use axum::http::StatusCode;
use crate::backend::chat::store::StoreError;
use crate::shared::SharedError;

/// Backend-specific error types
///
/// # Usage
///
/// ```rust
/// use axum::http::StatusCode;
/// use chathub::backend::error::BackendError;
///
/// let err = BackendError::handler(StatusCode::FORBIDDEN, "Origin not allowed");
/// assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// Handler error (e.g., rejected credential, forbidden origin)
    #[error("Handler error: {message}")]
    HandlerError {
        /// HTTP status code for this error
        status: StatusCode,
        /// Human-readable error message
        message: String,
    },

    /// Message store failure
    #[error(transparent)]
    StoreError(#[from] StoreError),

    /// Shared error (from shared module)
    #[error(transparent)]
    SharedError(#[from] SharedError),
}

impl BackendError {
    /// Create a new handler error with a status code
    ///
    /// # Arguments
    ///
    /// * `status` - HTTP status code
    /// * `message` - Error message
    pub fn handler(status: StatusCode, message: impl Into<String>) -> Self {
        Self::HandlerError {
            status,
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `HandlerError` - Uses the status code from the error
    /// - `StoreError` - 504 on timeout, 500 otherwise
    /// - `SharedError` - 400 for validation, 500 for serialization
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::HandlerError { status, .. } => *status,
            Self::StoreError(StoreError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::SharedError(err) => match err {
                SharedError::SerializationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                SharedError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            },
        }
    }

    /// Get the client-facing error message
    pub fn message(&self) -> String {
        match self {
            Self::HandlerError { message, .. } => message.clone(),
            Self::StoreError(_) => "Failed to fetch messages".to_string(),
            Self::SharedError(err) => err.client_reason(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_handler_error() {
        let error = BackendError::handler(StatusCode::UNAUTHORIZED, "Authentication required");
        match error {
            BackendError::HandlerError { status, message } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(message, "Authentication required");
            }
            _ => panic!("Expected HandlerError"),
        }
    }

    #[test]
    fn test_store_error_hides_details() {
        let error: BackendError = StoreError::Unavailable("connection refused on 10.0.0.3".to_string()).into();
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.message(), "Failed to fetch messages");
    }

    #[test]
    fn test_store_timeout_maps_to_gateway_timeout() {
        let error: BackendError = StoreError::Timeout(Duration::from_secs(5)).into();
        assert_eq!(error.status_code(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_from_shared_error() {
        let backend_error: BackendError = SharedError::validation("limit", "must be a number").into();
        assert_eq!(backend_error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(backend_error.message(), "must be a number");
    }
}
