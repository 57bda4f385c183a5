/**
 * Application State Management
 *
 * This module defines the application state shared by every handler and
 * the per-connection view of it handed to sessions.
 *
 * # Architecture
 *
 * `AppState` holds:
 * - The hub handle (cheap to clone, talks to the single hub task)
 * - The message store
 * - The identity verifier
 * - The server configuration
 *
 * Nothing here is behind a lock. The hub owns the member set and the store
 * and verifier are safe to call concurrently.
 */

use std::sync::Arc;

use crate::backend::auth::verifier::IdentityVerifier;
use crate::backend::chat::hub::Hub;
use crate::backend::chat::session::SessionContext;
use crate::backend::chat::store::MessageStore;
use crate::backend::server::config::ServerConfig;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Handle to the chat hub control loop
    pub hub: Hub,
    /// Message persistence
    pub store: Arc<dyn MessageStore>,
    /// Credential to identity resolution
    pub verifier: Arc<dyn IdentityVerifier>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Services handed to each new connection session
    pub fn session_context(&self) -> SessionContext {
        SessionContext {
            hub: self.hub.clone(),
            store: self.store.clone(),
            store_timeout: self.config.store_timeout,
            write_timeout: self.config.write_timeout,
        }
    }
}
