//! User endpoints

use axum::{
    extract::{Path, State},
    response::Json,
};

use super::dto::{IdentityResponse, UpdateOptionsRequest, UserResponse, UserWithIdentitiesResponse};
use crate::AppState;
use crate::data::{User, UserOptionsPatch};
use crate::error::AppError;
use crate::service::UserService;

/// Render a user with its identities, marking the primary ones
pub(super) async fn user_view(
    users: &UserService,
    user: &User,
) -> Result<UserWithIdentitiesResponse, AppError> {
    let twitter = users.twitter_identity(user).await?.map(|link| link.id);
    let mastodon = users.mastodon_identity(user).await?.map(|link| link.id);

    let identities = users
        .identities(user)
        .await?
        .iter()
        .map(|link| {
            let primary = Some(&link.id) == twitter.as_ref() || Some(&link.id) == mastodon.as_ref();
            IdentityResponse::from_authorization(link, primary)
        })
        .collect();

    Ok(UserWithIdentitiesResponse {
        user: UserResponse::from(user),
        identities,
    })
}

/// GET /api/v1/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserWithIdentitiesResponse>, AppError> {
    let user = state.users.get_user(&id).await?;
    Ok(Json(user_view(&state.users, &user).await?))
}

/// PATCH /api/v1/users/:id/options
///
/// Absent fields are left untouched, `null` clears an option.
pub async fn update_options(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateOptionsRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let patch = UserOptionsPatch::from(req);
    let user = state.users.update_options(&id, &patch).await?;
    Ok(Json(UserResponse::from(&user)))
}
