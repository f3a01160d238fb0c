//! Shared-secret bearer authentication for `/api` routes.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use tracing::debug;

pub async fn require_password(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(bearer_token)
        .unwrap_or_default();

    if presented.is_empty() || !password_matches(presented, &state.config.password) {
        return Err(AppError::Unauthorized);
    }

    debug!("Request authorized: {} {}", request.method(), request.uri().path());
    Ok(next.run(request).await)
}

/// Strips an optional `Bearer ` prefix and surrounding whitespace.
pub fn bearer_token(header: &str) -> &str {
    header.strip_prefix("Bearer ").unwrap_or(header).trim()
}

/// Compares SHA-256 digests so the check does not depend on where the inputs
/// first differ or on their lengths.
pub fn password_matches(presented: &str, expected: &str) -> bool {
    let presented = Sha256::digest(presented.trim().as_bytes());
    let expected = Sha256::digest(expected.trim().as_bytes());
    presented
        .iter()
        .zip(expected.iter())
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
