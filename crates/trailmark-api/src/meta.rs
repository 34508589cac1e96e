//! Liveness endpoints.

use axum::Json;
use axum::response::IntoResponse;

pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "Trailmark API is running",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
