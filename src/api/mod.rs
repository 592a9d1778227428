//! API layer
//!
//! HTTP handlers for:
//! - Identity linking (OAuth callback hand-over)
//! - User views and posting options
//! - Metrics (Prometheus)

mod dto;
mod identities;
pub mod metrics;
mod users;

pub use dto::*;
pub use metrics::metrics_router;

use axum::{
    Router,
    middleware,
    routing::{get, patch, post},
};

use crate::AppState;
use crate::auth::require_api_token;

/// Create the JSON API router
///
/// Routes (all require the API token):
/// - POST /api/v1/identities/callback - Link an OAuth identity
/// - GET /api/v1/users/:id - User with identities
/// - PATCH /api/v1/users/:id/options - Update posting options
pub fn api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/identities/callback", post(identities::link_callback))
        .route("/v1/users/:id", get(users::get_user))
        .route("/v1/users/:id/options", patch(users::update_options))
        .layer(middleware::from_fn_with_state(state, require_api_token))
}
