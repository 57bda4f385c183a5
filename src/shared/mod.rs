//! Shared Module
//!
//! This module contains types that are shared between the WebSocket session
//! code, the hub and the HTTP handlers: the chat message entity, the wire
//! envelope codec and the shared error type.
//!
//! # Overview
//!
//! Nothing in here depends on the server runtime. All types are designed for
//! JSON serialization and can be reused by a Rust client of the chat socket.

/// Chat message entity and author identity
pub mod message;

/// WebSocket envelope codec
pub mod envelope;

/// Shared error types
pub mod error;

/// Re-export commonly used types for convenience
pub use message::{ChatMessage, Identity, NewMessage};
pub use envelope::{ClientFrame, Envelope};
pub use error::SharedError;
