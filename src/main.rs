//! Drive Relay Server
//!
//! Brokers browser uploads into Google Drive through the resumable-upload
//! protocol, keeping backend session URLs and credentials server-side.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use drive_relay_server::config::Config;
use drive_relay_server::credentials;
use drive_relay_server::routes;
use drive_relay_server::state::AppState;
use drive_relay_server::storage::DriveClient;
use drive_relay_server::upload::InMemorySessionStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "drive_relay_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load config from env")?;

    tracing::info!("Starting Drive Relay Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Drive API: {}", config.drive.api_base);
    tracing::info!(
        single_shot_threshold = config.upload.single_shot_threshold,
        chunk_size = config.upload.chunk_size,
        session_max_age_secs = config.upload.session_max_age.as_secs(),
        "Upload limits"
    );
    if config.auth.allowed_origins.is_empty() {
        tracing::warn!("ALLOWED_ORIGINS is empty; browsers will be refused by CORS");
    }

    let credentials = credentials::from_config(&config.credentials)
        .context("Failed to initialize credential provider")?;
    let backend = DriveClient::new(&config.drive, config.upload.relay_timeout)
        .context("Failed to initialize Drive client")?;
    let store = InMemorySessionStore::new();

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid SERVER_HOST/SERVER_PORT")?;

    // Create application state
    let app_state = AppState::new(config, Arc::new(store), credentials, Arc::new(backend));

    let app = routes::app(app_state);

    // Start server with graceful shutdown
    tracing::info!("Drive Relay Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
