//! Crossposter - links Twitter and Mastodon identities to local users
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - OAuth callback hand-over                                 │
//! │  - User views and posting options                           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Identity linking                                         │
//! │  - Last-seen post bootstrap                                 │
//! └─────────────────────────────────────────────────────────────┘
//!                  │                           │
//! ┌──────────────────────────────┐ ┌──────────────────────────────┐
//! │          Data Layer          │ │        Social clients        │
//! │  - SQLite (sqlx)             │ │  - Twitter (OAuth 1.0a)      │
//! │                              │ │  - Mastodon (bearer)         │
//! └──────────────────────────────┘ └──────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `service`: Business logic layer
//! - `social`: Twitter and Mastodon REST clients
//! - `data`: Database layer
//! - `auth`: API token authentication
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;
pub mod social;

use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Identity linking
    pub linker: service::IdentityLinker,

    /// User lookups and options
    pub users: service::UserService,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Errors
    /// Returns error if the database or the HTTP client cannot be set up
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let db = data::Database::connect(&config.database.path).await?;
        tracing::info!(path = %config.database.path.display(), "Database connected");

        let clients = social::HttpSocialClients::new(&config)?;

        Ok(Self::from_parts(config, db, Arc::new(clients)))
    }

    /// Assemble state from already built parts
    pub fn from_parts(
        config: config::AppConfig,
        db: data::Database,
        clients: Arc<dyn social::SocialClients>,
    ) -> Self {
        let config = Arc::new(config);
        let db = Arc::new(db);

        Self {
            linker: service::IdentityLinker::new(db.clone(), clients.clone(), config.clone()),
            users: service::UserService::new(db.clone(), clients),
            config,
            db,
        }
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{cors::CorsLayer, trace::TraceLayer};

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api", api::api_router(state.clone()))
        .layer(TraceLayer::new_for_http())
        // Only the server-side front end calls this API
        .layer(CorsLayer::new())
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}
