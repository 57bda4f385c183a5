//! Route Configuration Module
//!
//! This module configures all HTTP routes for the backend server.
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs          - Module exports and documentation
//! ├── router.rs       - Main router creation, tracing and CORS layers
//! ├── chat_routes.rs  - Chat WebSocket and history routes
//! └── health.rs       - Liveness probe
//! ```
//!
//! # Route Types
//!
//! - `GET /health` - returns `OK`
//! - `GET /api/chat/ws` - WebSocket upgrade (`?token=` optional)
//! - `GET /api/chat/messages` - history (`?limit=&before_id=` optional)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chathub::backend::auth::HttpIdentityVerifier;
//! use chathub::backend::chat::InMemoryMessageStore;
//! use chathub::backend::routes::create_router;
//! use chathub::backend::server::{build_state, ServerConfig};
//!
//! # async fn example() {
//! let config = ServerConfig::default();
//! let verifier = Arc::new(HttpIdentityVerifier::new(&config.auth_service_url));
//! let (state, _hub) = build_state(config, Arc::new(InMemoryMessageStore::new()), verifier);
//! let router = create_router(state);
//! # }
//! ```

/// Main router creation
pub mod router;

/// Chat routes
pub mod chat_routes;

/// Health endpoint
pub mod health;

// Re-export commonly used functions
pub use router::create_router;
