/**
 * Server Initialization
 *
 * This module wires the application together and runs the HTTP listener.
 *
 * # Initialization Process
 *
 * 1. Load the message store selected by the configuration
 * 2. Create the identity verifier for the account service
 * 3. Spawn the hub control loop
 * 4. Create and configure the router
 *
 * # Shutdown
 *
 * [`serve`] stops accepting connections on Ctrl-C or SIGTERM, then gives
 * in-flight requests the configured budget to finish. Open WebSocket
 * sessions are not waited for past that budget.
 */

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backend::auth::verifier::{HttpIdentityVerifier, IdentityVerifier};
use crate::backend::chat::hub::Hub;
use crate::backend::chat::store::MessageStore;
use crate::backend::routes::router::create_router;
use crate::backend::server::config::{load_store, ServerConfig};
use crate::backend::server::state::AppState;

/// Assemble application state from already-built services
///
/// Spawns the hub control loop on the current runtime. The loop stops once
/// the returned state (and every clone of its hub handle) is dropped.
pub fn build_state(
    config: ServerConfig,
    store: Arc<dyn MessageStore>,
    verifier: Arc<dyn IdentityVerifier>,
) -> (AppState, JoinHandle<()>) {
    let (hub, hub_task) = Hub::spawn();
    let state = AppState {
        hub,
        store,
        verifier,
        config: Arc::new(config),
    };
    (state, hub_task)
}

/// Create and configure the Axum application
///
/// # Returns
///
/// Configured Axum Router ready to serve requests
///
/// # Error Handling
///
/// The function is designed to be resilient: a missing or unreachable
/// database falls back to the in-memory store.
pub async fn create_app(config: ServerConfig) -> Router<()> {
    tracing::info!("Initializing chat hub server");

    let store = load_store(&config).await;
    let verifier: Arc<dyn IdentityVerifier> = Arc::new(HttpIdentityVerifier::new(&config.auth_service_url));
    tracing::info!("Identity verifier using {}", config.auth_service_url);

    let (state, _hub_task) = build_state(config, store, verifier);

    create_router(state)
}

/// Bind the listener and serve until a shutdown signal arrives
pub async fn serve(config: ServerConfig) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let shutdown_timeout = config.shutdown_timeout;

    let app = create_app(config).await;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Chat hub listening on http://{}", addr);

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    let server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.clone().cancelled_owned())
            .into_future(),
    );
    let abort = server.abort_handle();

    // the shutdown budget starts when the signal arrives
    shutdown.cancelled().await;
    tracing::info!("Shutting down, waiting up to {:?} for open requests", shutdown_timeout);

    match tokio::time::timeout(shutdown_timeout, server).await {
        Ok(Ok(result)) => result?,
        Ok(Err(e)) => tracing::error!("Server task failed: {}", e),
        Err(_) => {
            tracing::warn!("Graceful shutdown timed out, closing remaining connections");
            abort.abort();
        }
    }

    tracing::info!("Server exited");
    Ok(())
}

/// Resolves on Ctrl-C, or on SIGTERM where available
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
