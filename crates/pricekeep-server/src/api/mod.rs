//! Application router
//!
//! Mounts the feature routes under `/api/v0`, adds the health probe and the
//! shared middleware stack.

pub mod response;

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::compression::CompressionLayer;

use crate::config::Config;
use crate::db::SharedStore;
use crate::error::AppError;
use crate::features;
use crate::middleware;

/// Build the full router around `store`.
pub fn create_router(store: SharedStore, config: &Config) -> Router {
    let feature_state = features::FeatureState {
        store: store.clone(),
        limits: config.limits,
    };

    Router::new()
        .route("/health", get(health_check))
        .with_state(store)
        .nest("/api/v0", features::router(feature_state))
        .fallback(not_found)
        // Apply layers from innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Health check handler
async fn health_check(State(store): State<SharedStore>) -> Result<impl IntoResponse, AppError> {
    store.ping().await?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "database": "connected"
        })),
    ))
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
