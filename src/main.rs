use image_similarity::{create_router, init, AppState, Config, EmbeddingModel};

use std::sync::Arc;

use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize the application
    init()?;

    let config = Config::from_env()?;

    // The model is loaded once and shared read-only by every request
    let weights = config.weights_path.clone();
    let device = config.device;
    let model = tokio::task::spawn_blocking(move || EmbeddingModel::load(weights, device))
        .await?
        .context("failed to load embedding model")?;
    log::info!("Embedding model ready: {:?}", model);

    let state = AppState::with_config(config, Arc::new(model));
    let addr = state.config.socket_addr();
    let app = create_router(state);

    // Set up the server
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    log::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    log::info!("Shutdown signal received");
}
