//! # cart-server
//!
//! ## Usage
//!
//! ```bash
//! export HOST=0.0.0.0
//! export PORT=8080
//! export ENVIRONMENT=production
//!
//! cart-server
//! ```

use cart_api::{routes, AppConfig, AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = AppConfig::from_env();
    let addr = config
        .socket_addr()
        .map_err(|e| anyhow::anyhow!("Invalid HOST/PORT {}:{}: {}", config.host, config.port, e))?;

    info!("Environment: {}", config.environment);

    let app = routes::create_router(AppState::new(config));

    info!("Cart server starting on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Cart server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
