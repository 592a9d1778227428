//! Identity linking endpoint
//!
//! Receives the outcome of an OAuth handshake that the web front end
//! completed with Twitter or Mastodon.

use axum::{extract::State, response::Json};

use super::dto::{LinkIdentityRequest, UserWithIdentitiesResponse};
use super::users::user_view;
use crate::AppState;
use crate::error::AppError;

/// POST /api/v1/identities/callback
///
/// Returns 404 when the identity is unknown and registration is disabled,
/// or when `current_user_id` names no user.
pub async fn link_callback(
    State(state): State<AppState>,
    Json(req): Json<LinkIdentityRequest>,
) -> Result<Json<UserWithIdentitiesResponse>, AppError> {
    let callback = req.to_callback()?;

    let current_user = match req.current_user_id.as_deref() {
        Some(id) => Some(state.users.get_user(id).await?),
        None => None,
    };

    let user = state
        .linker
        .link_identity(&callback, current_user.as_ref())
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(user_view(&state.users, &user).await?))
}
