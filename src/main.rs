//! Podium - live conference moderation orchestrator
//!
//! A Rust backend that drives a realtime voice agent through a conference
//! agenda: a phase state machine per conference, a precision session timer,
//! and WebSocket channels for operators and the agent transport.

mod agenda;
mod api;
mod bridge;
mod config;
mod error;
mod runtime;
mod sideband;
mod state_machine;
mod timer;
mod tools;

use std::net::SocketAddr;

use api::{create_router, AppState};
use config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "podium=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let settings = Settings::from_env();
    let port = settings.port;
    tracing::info!(
        port,
        warning_threshold = settings.warning_threshold,
        "Starting podium"
    );

    let state = AppState::new(settings);
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
