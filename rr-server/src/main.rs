//! RaceReplay Server
//!
//! Serves replay frames, standings and overlays for one loaded race session

use anyhow::Result;
use rr_server::{api, config::ServerConfig, manager, state};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting RaceReplay Server");

    let config = ServerConfig::load()?;
    let addr = config.socket_addr()?;
    info!("Session dumps read from {}", config.data_dir.display());

    // Create application state
    let state = state::AppState::new(config);

    // Optional session to have ready at startup, e.g. RR_PRELOAD=demo
    if let Ok(source) = std::env::var("RR_PRELOAD") {
        let request = manager::LoadRequest {
            source,
            ..Default::default()
        };
        if let Err(e) = manager::load_session(&state, request).await {
            warn!("Preload failed: {}", e);
        }
    }

    // Build the router
    let app = api::create_router(state);

    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
