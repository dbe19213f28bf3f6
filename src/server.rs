//! # Server Module
//!
//! HTTP server setup and route configuration for the admin backend.

use anyhow::{Context, Result};
use axum::Router;
use axum::http::{HeaderValue, Method, header};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::auth::jwt::JwtService;
use crate::config::{Config, StoreBackend, UploadConfig};
use crate::database::memory::{MemoryAdminStore, MemoryProductStore};
use crate::database::postgres::{PgAdminStore, PgProductStore};
use crate::database::{AdminStore, DatabaseConfig, DatabaseConnection, ProductStore};
use crate::routes;
use crate::services::{CloudinaryClient, ImageRelay};

/// Application state shared across all route handlers
#[derive(Clone)]
pub struct AppState {
    pub admins: Arc<dyn AdminStore>,
    pub products: Arc<dyn ProductStore>,
    pub jwt_service: Arc<JwtService>,
    pub relay: ImageRelay,
    pub uploads: Arc<UploadConfig>,
    /// Mark the session cookie `Secure` (and `SameSite=None`)
    pub cookie_secure: bool,
}

/// Build the full application router around `state`
pub fn build_router(state: AppState, cors_origin: &str, static_dir: &Path) -> Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("CORS_ORIGIN `{cors_origin}` is not a valid header value"))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ])
        .allow_credentials(true);

    let body_limit = state.uploads.body_limit();

    let app = Router::new()
        .merge(routes::health::create_routes())
        .merge(routes::auth::create_auth_routes())
        .merge(routes::product::create_product_routes(body_limit))
        .fallback_service(ServeDir::new(static_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state);

    Ok(app)
}

/// Wire stores and services from configuration
async fn build_state(config: &Config) -> Result<AppState> {
    let (admins, products): (Arc<dyn AdminStore>, Arc<dyn ProductStore>) = match config.database.backend {
        StoreBackend::Postgres => {
            let db_config = DatabaseConfig::from_settings(&config.database)?;
            let db = DatabaseConnection::new(db_config).await?;
            db.migrate().await?;
            let stats = db.stats();
            tracing::info!("🗄️  Store backend: postgres (pool size {}, idle {})", stats.size, stats.idle);
            (
                Arc::new(PgAdminStore::new(db.pool().clone())) as Arc<dyn AdminStore>,
                Arc::new(PgProductStore::new(db.pool().clone())) as Arc<dyn ProductStore>,
            )
        }
        StoreBackend::Memory => {
            tracing::warn!("🗄️  Store backend: memory (data is lost on restart)");
            (
                Arc::new(MemoryAdminStore::new()) as Arc<dyn AdminStore>,
                Arc::new(MemoryProductStore::new()) as Arc<dyn ProductStore>,
            )
        }
    };

    tokio::fs::create_dir_all(&config.uploads.dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", config.uploads.dir.display()))?;

    let cloudinary = CloudinaryClient::new(config.cloudinary.clone())
        .context("Failed to build Cloudinary client")?;

    Ok(AppState {
        admins,
        products,
        jwt_service: Arc::new(JwtService::new(&config.auth.jwt_secret)),
        relay: ImageRelay::new(Arc::new(cloudinary)),
        uploads: Arc::new(config.uploads.clone()),
        cookie_secure: config.auth.cookie_secure,
    })
}

/// Starts the admin HTTP server and serves until the process is stopped.
pub async fn start(config: Config) -> Result<()> {
    let state = build_state(&config).await?;
    let app = build_router(state, &config.cors_origin, &config.static_dir)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr} - port may already be in use"))?;

    tracing::info!("🚀 Admin server starting...");
    tracing::info!("📡 Listening on http://{}", addr);
    tracing::info!("🏥 Health check available at http://{}/ping", addr);
    tracing::info!("🌐 CORS origin: {}", config.cors_origin);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
