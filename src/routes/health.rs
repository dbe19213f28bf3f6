use axum::{Router, response::Json, routing::get};
use serde_json::json;

use crate::server::AppState;

/// Health check endpoint handler.
///
/// Lightweight liveness probe for load balancers and uptime monitors. It does
/// not touch the store or the image host.
///
/// # Route
/// - **Method**: GET
/// - **Path**: `/ping`
/// - **Response**: `{"status": "pong"}`
///
/// # Examples
/// ```bash
/// curl http://localhost:5000/ping
/// # Response: {"status":"pong"}
/// ```
pub async fn ping() -> Json<serde_json::Value> {
    Json(json!({ "status": "pong" }))
}

/// Root greeting, kept so existing dashboards that probe `/` keep working
pub async fn welcome() -> Json<serde_json::Value> {
    Json(json!("✅ Welcome to Watch G Admin Dashboard Backend"))
}

pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(welcome))
        .route("/ping", get(ping))
}
