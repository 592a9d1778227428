//! Authentication middleware
//!
//! Protects routes that require the service API token.

use axum::{
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};

use crate::AppState;
use crate::error::AppError;

fn extract_token_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Compare digests so the comparison time does not depend on how much of
/// the presented token matches.
fn token_matches(presented: &str, expected: &str) -> bool {
    let presented = Sha256::digest(presented.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    presented
        .iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Middleware to require the API token
///
/// # Usage
/// ```ignore
/// let protected_routes = Router::new()
///     .route("/v1/...", ...)
///     .layer(middleware::from_fn_with_state(state, require_api_token));
/// ```
pub async fn require_api_token(
    State(state): State<AppState>,
    request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token_from_headers(request.headers()).ok_or(AppError::Unauthorized)?;

    if !token_matches(token, &state.config.auth.api_token) {
        tracing::debug!(path = %request.uri().path(), "Rejected request with invalid API token");
        return Err(AppError::Unauthorized);
    }

    Ok(next.run(request).await)
}
