//! Crossposter binary entry point

use crossposter::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Load configuration from file and environment
/// 2. Initialize tracing/logging from the `logging` section
/// 3. Initialize metrics
/// 4. Initialize AppState
/// 5. Build Axum router and start the HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration
    let config = config::AppConfig::load()?;

    // 2. Initialize tracing/logging; RUST_LOG overrides logging.level
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| config.logging.default_directives().into())
    };

    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter())
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter())
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!(
        allow_new_users = config.allow_new_users(),
        twitter_api = %config.twitter.api_base_url,
        "Starting Crossposter..."
    );
    if config.twitter.client_id.is_empty() || config.twitter.client_secret.is_empty() {
        tracing::warn!("Twitter client credentials are not configured; twitter bootstraps will fail");
    }

    // 3. Initialize metrics
    crossposter::metrics::init_metrics();

    // 4. Initialize application state
    let state = AppState::new(config.clone()).await?;

    // 5. Build Axum router and serve
    let app = crossposter::build_router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
