//! Product API server
//! Registration / login and an authenticated, rate-limited product listing

use anyhow::{Context, Result};
use product_api::{
    config::{load_env, Config},
    server::{shutdown_signal, spawn_rate_limit_cleanup},
    AppState, Database, Server,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    load_env();
    init_tracing();

    info!("Product API starting");

    // A missing signing secret stops startup here
    let config = Config::load().context("Invalid configuration")?;

    let db = Database::open(&config.database_path)
        .with_context(|| format!("Failed to open database at {}", config.database_path))?;

    let state = AppState::from_config(&config, db)?;
    info!(
        max_requests = config.rate_limit_max_requests,
        window_secs = config.rate_limit_window_secs,
        "Rate limiting /api/products"
    );

    spawn_rate_limit_cleanup(state.rate_limiter.clone());

    Server::new(config.bind_addr.clone(), state)
        .run(shutdown_signal())
        .await
}

/// Initialize tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "product_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
