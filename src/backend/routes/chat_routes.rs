/**
 * Chat Route Configuration
 *
 * # Routes
 *
 * - `GET /api/chat/ws` - WebSocket upgrade into a chat session
 * - `GET /api/chat/messages` - Chat history as a JSON array
 */

use axum::{routing::get, Router};

use crate::backend::chat::handlers::{handle_chat_socket, handle_get_history};
use crate::backend::server::state::AppState;

/// Configure chat-related routes
///
/// # Arguments
///
/// * `router` - The router to add routes to
///
/// # Returns
///
/// Router with chat routes configured
pub fn configure_chat_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/api/chat/ws", get(handle_chat_socket))
        .route("/api/chat/messages", get(handle_get_history))
}
