//! piine-relay server entry point.
//!
//! Binds `0.0.0.0:$PORT` and serves the WebSocket relay until Ctrl+C or
//! SIGTERM.

use tracing_subscriber::EnvFilter;

use piine_relay::app_state::AppState;
use piine_relay::config::RelayConfig;
use piine_relay::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = RelayConfig::from_env()?;
    let addr = config.listen_addr();
    tracing::info!(%addr, "starting piine-relay");

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");

    server::serve(listener, AppState::default(), server::shutdown_signal()).await?;

    tracing::info!("server stopped");
    Ok(())
}
