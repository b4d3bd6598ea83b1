//! CuraVyom Web Server
//!
//! Run with: cargo run -p curavyom-web

use std::net::SocketAddr;
use std::sync::Arc;
use curavyom_config::CuravyomConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("curavyom=debug,info")),
        )
        .init();

    info!("🧬 Starting CuraVyom Web Server...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = CuravyomConfig::load()?;
    let endpoints = config.endpoints();
    info!("Agent Core chat: {}", endpoints.chat);
    info!("Agent Core API:  {}", config.api.base_url);

    let addr: SocketAddr = config.web.bind.parse()?;

    // Create app state
    let state = Arc::new(curavyom_web::state::AppState::new(config)?);

    // Build router
    let app = curavyom_web::router::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🚀 Server listening on http://{}", addr);
    info!("📱 Open your browser and navigate to http://{}/demo", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
