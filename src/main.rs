//! Parking Stream Server
//!
//! Main entry point: configuration, shared detection client, HTTP/WebSocket server.

use parking_stream_server::{
    ai_client::InferenceClient,
    state::{AppConfig, AppState},
    web_api,
};
use axum::http::HeaderValue;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Optional .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parking_stream_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Parking Stream Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    config.validate()?;

    tracing::info!(
        environment = ?config.environment,
        dynamic_frame_skipping = config.dynamic_frame_skipping,
        gate_frame_skip = config.gate_frame_skip,
        lot_frame_skip = config.lot_frame_skip,
        dedup_window_sec = config.gate_dedup_window.as_secs(),
        dedup_refresh = config.gate_dedup_refresh.as_str(),
        "Configuration loaded"
    );

    // Shared detection client
    let inference = Arc::new(InferenceClient::new(
        config.inference_url.clone(),
        config.inference_timeout,
    )?);

    if inference.health_check().await.unwrap_or(false) {
        tracing::info!(url = %inference.base_url(), "Inference service reachable");
    } else {
        tracing::warn!(url = %inference.base_url(), "Inference service not reachable yet");
    }

    let state = AppState::new(config.clone(), inference);

    let cors = match config.frontend_url.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(e) => {
            tracing::warn!(frontend_url = %config.frontend_url, error = %e, "Invalid FRONTEND_URL, CORS disabled");
            CorsLayer::new()
        }
    };

    let app = web_api::create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
