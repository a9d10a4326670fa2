use tracing::{error, info};

use websocket_api::config::ServerConfig;
use websocket_api::{app, build_state};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_target(false)
        .init();

    let state = build_state(&config).await;
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Duel server listening on {}", config.bind_addr);

    axum::serve(listener, app(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down, waiting for pending duel writes");
    state.coordinator.flush_background_tasks().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
