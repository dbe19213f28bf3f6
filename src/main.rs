//! # Watch G Admin Server
//!
//! Administrative HTTP API for the Watch G storefront, built with Axum and Tokio.
//!
//! ## Features
//! - Admin registration, login and cookie-based session checks (argon2 + JWT)
//! - Product catalog CRUD with up to four images per product
//! - Image hosting on Cloudinary, with local staging cleaned up on every path
//! - PostgreSQL persistence with embedded migrations, or an in-memory store
//!
//! ## Architecture
//! - `server`: router assembly and startup
//! - `config`: environment configuration, loaded once and passed down
//! - `auth`: password hashing, session tokens, auth payloads
//! - `database`: store traits with PostgreSQL and in-memory implementations
//! - `services`: image relay and the Cloudinary client
//! - `routes`: HTTP handlers
//!   - `health`: welcome and ping endpoints
//!   - `auth`: `/api/v1/addAdmin`, `/api/v1/loginAdmin`, `/api/v1/isLogin`
//!   - `product`: `/api/v1/*Product*` endpoints
//!
//! ## Environment Setup
//! Copy `.env.example` to `.env` and fill in the database URL, JWT secret and
//! Cloudinary credentials.
//!
//! ## Running the Server
//! ```bash
//! cargo run
//! ```
//!
//! The server listens on `0.0.0.0:5000` unless `PORT` says otherwise.

mod auth;
mod config;
mod database;
mod error;
mod routes;
mod server;
mod services;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber
        ::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt
                ::layer()
                .with_target(false) // Don't show module targets for cleaner output
                .compact()
        )
        .init();

    tracing::info!("🏁 Starting admin server...");
    tracing::info!("📦 Package: {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    tracing::info!("🏗️  Build profile: {}", if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    });

    let config = match config::Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration error: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server::start(config).await {
        tracing::error!("❌ Server failed: {:#}", e);
        std::process::exit(1);
    }
}
