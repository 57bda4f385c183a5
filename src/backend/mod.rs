//! Backend Module
//!
//! This module contains all server-side code for the chat hub: an Axum HTTP
//! server that upgrades clients to WebSockets, fans chat messages out to
//! every connected session and serves persisted history.
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! - **`server`** - Configuration, application state, startup and shutdown
//! - **`routes`** - HTTP route configuration and router assembly
//! - **`chat`** - Hub, connection sessions, message store, chat handlers
//! - **`auth`** - Credential extraction and identity verification
//! - **`error`** - Backend-specific error types
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── main.rs         - Server binary
//! ├── server/         - Server initialization and state
//! ├── routes/         - Route configuration
//! ├── chat/           - Hub, sessions, store, handlers
//! ├── auth/           - Identity verification
//! └── error/          - Error types
//! ```
//!
//! # Concurrency
//!
//! - One hub task owns the member set; everything else sends it events
//! - Two tasks per connection (reader and writer) sharing one cancellation
//!   token
//! - One bounded outbound queue per connection; a full queue gets the
//!   connection dropped instead of slowing the hub down
//!
//! # Error Handling
//!
//! - `BackendError` for HTTP handlers, rendered as JSON
//! - Errors inside a live session become `error` envelopes for that peer
//!   only and never end the session

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Chat hub, sessions and persistence
pub mod chat;

/// Backend error types
pub mod error;

/// Identity verification
pub mod auth;

/// Re-export commonly used types
pub use error::BackendError;
pub use server::{create_app, serve, AppState, ServerConfig};
