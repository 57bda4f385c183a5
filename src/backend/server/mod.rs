//! Server Module
//!
//! This module contains the code that initializes and runs the Axum HTTP
//! server.
//!
//! # Architecture
//!
//! - **`state`** - Application state and the session context built from it
//! - **`config`** - Environment configuration and message store selection
//! - **`init`** - State assembly, app creation and the serve loop
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs          - Module exports and documentation
//! ├── state.rs        - AppState and session_context
//! ├── config.rs       - ServerConfig, ConfigError, load_store
//! └── init.rs         - build_state, create_app, serve
//! ```
//!
//! # Initialization Flow
//!
//! 1. **Configuration Loading**: `ServerConfig::from_env`
//! 2. **Store Selection**: Postgres if configured and reachable, else in-memory
//! 3. **Hub Startup**: the hub control loop is spawned
//! 4. **Router Creation**: routes, tracing and CORS layers
//!
//! # Example
//!
//! ```rust,no_run
//! use chathub::backend::server::{config::ServerConfig, init::serve};
//!
//! # async fn example() -> std::io::Result<()> {
//! let config = ServerConfig::default();
//! serve(config).await
//! # }
//! ```

/// Application state management
pub mod state;

/// Server configuration loading
pub mod config;

/// Server initialization
pub mod init;

// Re-export commonly used types
pub use config::{ConfigError, ServerConfig};
pub use init::{build_state, create_app, serve};
pub use state::AppState;
