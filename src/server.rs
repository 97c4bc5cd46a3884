//! HTTP server: route composition, interceptor ordering and lifecycle

use crate::auth::{api as auth_api, auth_middleware, AuthState, JwtHandler, UserStore};
use crate::catalog::{api as catalog_api, CatalogState, ProductStore};
use crate::config::Config;
use crate::db::Database;
use crate::error::ConfigError;
use crate::middleware::{
    rate_limit_middleware, request_logging, RateLimitConfig, RateLimitLayer,
};
use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthState,
    pub catalog: CatalogState,
    pub rate_limiter: RateLimitLayer,
}

impl AppState {
    pub fn new(
        db: Database,
        jwt_handler: Arc<JwtHandler>,
        bcrypt_cost: u32,
        rate_limiter: RateLimitLayer,
    ) -> Self {
        Self {
            auth: AuthState::new(UserStore::new(db.clone()), jwt_handler, bcrypt_cost),
            catalog: CatalogState {
                products: ProductStore::new(db),
            },
            rate_limiter,
        }
    }

    /// Wire every component from validated configuration.
    pub fn from_config(config: &Config, db: Database) -> Result<Self, ConfigError> {
        config.validate()?;

        let jwt_handler = Arc::new(JwtHandler::new(config.signing_secret()?)?);
        let rate_limiter = RateLimitLayer::new(RateLimitConfig {
            max_requests: config.rate_limit_max_requests,
            window: config.rate_limit_window(),
        });

        Ok(Self::new(db, jwt_handler, config.bcrypt_cost, rate_limiter))
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the API router.
///
/// `/api/products` runs its interceptors outermost first: the rate limiter,
/// then the access gate, then the handler. Auth routes are not rate limited.
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/api/auth/register", post(auth_api::register))
        .route("/api/auth/login", post(auth_api::login))
        .with_state(state.auth.clone());

    // route_layer wraps what is already there, so the last one added runs first
    let product_routes = Router::new()
        .route("/api/products", get(catalog_api::list_products))
        .route_layer(middleware::from_fn_with_state(
            state.auth.jwt_handler.clone(),
            auth_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
        .with_state(state.catalog);

    Router::new()
        .route("/health", get(health_check))
        .merge(auth_routes)
        .merge(product_routes)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
}

/// Periodically evict idle rate limiter entries.
pub fn spawn_rate_limit_cleanup(limiter: RateLimitLayer) -> tokio::task::JoinHandle<()> {
    let period = limiter.config().window.max(Duration::from_secs(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            limiter.cleanup();
            debug!(clients = limiter.tracked_clients(), "Rate limiter cleanup");
        }
    })
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

pub struct Server {
    bind_addr: String,
    state: AppState,
}

impl Server {
    pub fn new(bind_addr: impl Into<String>, state: AppState) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            state,
        }
    }

    /// Serve until `shutdown` resolves.
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let app = build_router(self.state);

        let listener = TcpListener::bind(&self.bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.bind_addr))?;
        info!("API server listening on {}", listener.local_addr()?);

        // Connect info supplies the client address the rate limiter keys on
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await
        .context("Server error")?;

        info!("Server shutdown complete");
        Ok(())
    }
}
