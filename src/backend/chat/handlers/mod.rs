//! Chat Handlers Module
//!
//! Axum handlers for the chat endpoints.
//!
//! # Module Structure
//!
//! ```text
//! handlers/
//! ├── mod.rs          - Module exports and documentation
//! ├── websocket.rs    - WebSocket upgrade into a connection session
//! └── history.rs      - Chat history read endpoint
//! ```
//!
//! # Route Handlers
//!
//! ## GET /api/chat/ws
//!
//! Upgrades to a WebSocket. The first frame is `auth_success` for a verified
//! peer or `connection_info` for an anonymous one; afterwards the peer
//! receives every broadcast chat message.
//!
//! ## GET /api/chat/messages
//!
//! Returns persisted messages as a JSON array.

/// WebSocket upgrade handler
pub mod websocket;

/// History handler
pub mod history;

pub use history::handle_get_history;
pub use websocket::handle_chat_socket;
