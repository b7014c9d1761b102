//! HTTP routes for the chat server

pub mod ask;
pub mod ui;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Json, Router,
};

use crate::server::state::AppState;
use crate::types::HealthResponse;

/// Build all routes
pub fn routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/", get(ui::index))
        .route("/health", get(health_check))
        // Larger body limit for PDF uploads
        .route(
            "/upload",
            post(upload::upload_files).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/ask", post(ask::ask))
}

/// GET /health
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
