//! Chat Backend Module
//!
//! This module contains the real-time chat core:
//! - the hub, which owns the set of live sessions and fans messages out
//! - connection sessions, one per WebSocket, with a reader and a writer loop
//! - the message store contract and its Postgres/in-memory implementations
//! - the HTTP handlers that create sessions and serve history
//!
//! # Architecture
//!
//! - **`hub`** - Single-owner control loop (register, unregister, broadcast)
//! - **`session`** - Connection session lifecycle and frame handling
//! - **`store`** - `MessageStore` trait, history query, in-memory store
//! - **`db`** - PostgreSQL store
//! - **`handlers`** - WebSocket upgrade and history endpoints
//!
//! # Message Flow
//!
//! ```text
//! client frame -> session reader -> store.append -> hub.broadcast
//!              -> every member's outbound queue -> session writer -> client
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use chathub::backend::chat::{Hub, InMemoryMessageStore, Session, SessionContext};
//! use chathub::shared::Identity;
//!
//! # async fn example() {
//! let (hub, _task) = Hub::spawn();
//! let ctx = SessionContext {
//!     hub,
//!     store: Arc::new(InMemoryMessageStore::new()),
//!     store_timeout: Duration::from_secs(5),
//!     write_timeout: Duration::from_secs(10),
//! };
//! let (session, outbound) = Session::connect(Some(Identity::new(1, "alice")), ctx)
//!     .await
//!     .unwrap();
//! session.handle_text(r#"{"type":"message","content":"hi"}"#).await;
//! # drop(outbound);
//! # }
//! ```

/// Hub control loop
pub mod hub;

/// Connection session
pub mod session;

/// Message store contract
pub mod store;

/// Database operations for chat messages
pub mod db;

/// HTTP handlers
pub mod handlers;

/// Re-export commonly used types
pub use db::PgMessageStore;
pub use handlers::{handle_chat_socket, handle_get_history};
pub use hub::{Hub, HubClosed};
pub use session::{Session, SessionContext, SessionState};
pub use store::{HistoryOrder, HistoryQuery, InMemoryMessageStore, MessageStore, StoreError};
