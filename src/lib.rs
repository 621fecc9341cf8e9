pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use anyhow::Context;

use api::{create_router, AppState};
use config::Config;
use db::{spawn_sweeper, Catalog, InMemorySessionStore, SessionStore};
use services::{Predictor, SvdModel};

/// Loads the catalog and model, then serves until Ctrl-C
pub async fn run(config: Config) -> anyhow::Result<()> {
    let catalog = Catalog::load(&config.books_path, &config.ratings_path).with_context(|| {
        format!(
            "Failed to load catalog from {} and {}",
            config.books_path, config.ratings_path
        )
    })?;
    let model = SvdModel::load(&config.model_path)
        .with_context(|| format!("Failed to load model from {}", config.model_path))?;

    let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(config.session_ttl()));
    let sweeper = spawn_sweeper(sessions.clone(), config.session_sweep_interval());

    let predictor: Arc<dyn Predictor> = Arc::new(model);
    let state = AppState::new(Arc::new(catalog), predictor, sessions);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr()))?;
    tracing::info!(addr = %config.bind_addr(), "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
