//! Support Chat Relay Server Library
//!
//! Message relay endpoint plus the realtime pub/sub channels it publishes to.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod pubsub;

use axum::{routing::get, Router};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

pub use config::{AppState, RelayConfig};
pub use error::{Error, Result};

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    handlers::router(state.clone())
        .route("/health", get(health_check))
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        debug!("Global tracing subscriber already installed");
    }

    info!("=== Support Chat Relay ===");

    let config = RelayConfig::from_env();
    if config.channel_token.is_none() {
        info!("RELAY_CHANNEL_TOKEN unset, private channels and triggers are disabled");
    }
    match &config.forward_url {
        Some(url) => info!("Forwarding publishes to {}", url),
        None => info!("Publishing to the in-process channel hub"),
    }

    let state = AppState::new(config.clone())?;
    let app = app(state);

    info!("Listening on http://{}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn health_check() -> &'static str {
    "OK - Support Chat Relay"
}
