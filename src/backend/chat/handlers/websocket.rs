/**
 * Chat WebSocket Handler
 *
 * Handles `GET /api/chat/ws`, the entry point of every connection session.
 *
 * # Upgrade Flow
 *
 * 1. Refuse the upgrade with 403 if the `Origin` is not allowed
 * 2. Extract the credential (`?token=`, else `Authorization: Bearer`)
 * 3. Resolve it to an identity under the verifier timeout
 * 4. If that fails and anonymous access is disabled, refuse with 401
 * 5. Upgrade, greet the peer and run the session until it closes
 *
 * Identity is settled before the upgrade, so a slow account service delays
 * only this handshake and never the hub.
 */

use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::{HeaderMap, StatusCode},
    response::Response,
};
use serde::Deserialize;

use crate::backend::auth::{extract_credential, origin_allowed, resolve_identity};
use crate::backend::chat::session::Session;
use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;

/// Query parameters accepted on the upgrade request
#[derive(Debug, Default, Deserialize)]
pub struct SocketParams {
    pub token: Option<String>,
}

/// Upgrade an HTTP request into a chat session
///
/// # Arguments
///
/// * `ws` - Axum WebSocket upgrade extractor
/// * `state` - Application state
/// * `params` - Optional `token` query parameter
/// * `headers` - Request headers (`Origin`, `Authorization`)
///
/// # Returns
///
/// `101 Switching Protocols` on success, a JSON error otherwise
pub async fn handle_chat_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<SocketParams>,
    headers: HeaderMap,
) -> Result<Response, BackendError> {
    if !origin_allowed(&headers, &state.config.allowed_origins) {
        tracing::warn!("[Session] Refusing upgrade from origin {:?}", headers.get("origin"));
        return Err(BackendError::handler(StatusCode::FORBIDDEN, "Origin not allowed"));
    }

    let credential = extract_credential(&headers, params.token.as_deref());
    let identity = resolve_identity(state.verifier.as_ref(), credential, state.config.verify_timeout).await;

    if identity.is_none() && state.config.reject_anonymous {
        return Err(BackendError::handler(StatusCode::UNAUTHORIZED, "Authentication required"));
    }

    let ctx = state.session_context();
    Ok(ws.on_upgrade(move |socket| async move {
        match Session::connect(identity, ctx).await {
            Ok((session, outbound)) => {
                tracing::info!(
                    "[Session] {} connected as {}",
                    session.id(),
                    session
                        .identity()
                        .map(|i| i.username.as_str())
                        .unwrap_or("anonymous")
                );
                let id = session.id();
                session.run(socket, outbound).await;
                tracing::info!("[Session] {} disconnected", id);
            }
            Err(e) => tracing::error!("[Session] Could not join the hub: {}", e),
        }
    }))
}
