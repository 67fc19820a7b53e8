//! HTTP and WebSocket API.
//!
//! Operators drive a conference over one WebSocket; the voice-agent
//! transport attaches over a second. Everything else is a thin REST shim.

mod types;
mod ws;

use std::sync::Arc;

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::runtime::RuntimeManager;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<RuntimeManager>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            runtime: Arc::new(RuntimeManager::new(settings)),
        }
    }
}

/// Create the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/api/conferences/:id/ws", get(ws::operator_ws))
        .route("/api/conferences/:id/sideband", get(ws::sideband_ws))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "port": state.runtime.settings().port,
    }))
}

async fn version() -> Json<serde_json::Value> {
    Json(json!({ "version": env!("CARGO_PKG_VERSION") }))
}
