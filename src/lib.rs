//! Chat Hub - Main Library
//!
//! A real-time chat service: clients connect over WebSocket, optionally
//! present a token that an external account service resolves to an
//! identity, and every message an authenticated client posts is persisted
//! and broadcast to all connected clients. Anonymous clients receive but
//! cannot post.
//!
//! # Module Structure
//!
//! - **`shared`** - Types that do not depend on the server runtime
//!   - Chat message and identity types
//!   - WebSocket envelope codec
//!   - Error types
//!
//! - **`backend`** - Server-side code (only compiled with `ssr` feature)
//!   - Axum HTTP server, WebSocket sessions and the hub
//!   - Message store (PostgreSQL or in-memory)
//!   - Identity verification through the account service
//!
//! # Feature Flags
//!
//! - **`ssr`** - Enables the backend modules (on by default)
//!
//! # Usage
//!
//! ```rust,no_run
//! use chathub::backend::server::{serve, ServerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env()?;
//! serve(config).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Wire Protocol
//!
//! Every WebSocket frame is a JSON object with a `type` discriminator:
//! `message`, `auth_success`, `connection_info` or `error`. Clients only
//! send `message` frames, optionally with a `tempId` that is echoed back on
//! the broadcast copy so the sender can reconcile its optimistic message.

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
#[cfg(feature = "ssr")]
pub mod backend;
