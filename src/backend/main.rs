/**
 * Chat Hub Server Entry Point
 *
 * Loads `.env`, initializes tracing, reads the configuration and serves
 * until Ctrl-C or SIGTERM.
 */

#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,chathub=debug".to_string());

    eprintln!("[STARTUP] Setting RUST_LOG={}", env_filter);

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    tracing::info!("[STARTUP] Server initialization started");

    let config = chathub::backend::server::ServerConfig::from_env()?;
    tracing::info!(
        "[STARTUP] Port {}, store {}, anonymous {}",
        config.http_port,
        if config.database_url.is_some() { "postgres" } else { "in-memory" },
        if config.reject_anonymous { "rejected" } else { "read-only" }
    );

    chathub::backend::server::serve(config).await?;

    Ok(())
}

#[cfg(not(feature = "ssr"))]
fn main() {
    eprintln!("Server requires the 'ssr' feature to be enabled.");
    eprintln!("Run with: cargo run --bin chathub-server --features ssr");
    std::process::exit(1);
}
