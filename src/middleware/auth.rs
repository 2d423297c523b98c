//! Administrative credential middleware.
//!
//! This middleware intercepts every admin request to:
//! 1. Extract the bearer token from the Authorization header
//! 2. Compare it against the configured administrative credential
//! 3. Reject unauthorized requests with HTTP 401
//!
//! The check runs before any record store access, so an unauthenticated
//! caller cannot enumerate keys or even observe store latency. The admin
//! credential is a separate trust domain from the activation keys: client
//! devices never present it, operators never present activation keys.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};

use crate::{app::AppState, error::AppError};

/// Administrative authentication middleware function.
///
/// # Flow
///
/// 1. Extract `Authorization: Bearer <token>` header from request
/// 2. Hash both the presented and the configured token with SHA-256
/// 3. Compare the digests
/// 4. If they match: call next handler
/// 5. If not: return 401 Unauthorized error
///
/// Comparing digests rather than the raw strings keeps the comparison
/// fixed-width regardless of how much of the token an attacker guessed.
///
/// # Headers
///
/// Expected header format:
/// ```text
/// Authorization: Bearer <admin token>
/// ```
pub async fn admin_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Step 1: Extract Authorization header
    let auth_header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    // Step 2: Extract Bearer token
    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AppError::Unauthorized)?;

    // Step 3: Compare SHA-256 digests
    if sha256_hex(token) != sha256_hex(&state.config.admin_token) {
        return Err(AppError::Unauthorized);
    }

    // Step 4: Call the next middleware/handler
    Ok(next.run(request).await)
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
