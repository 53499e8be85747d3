use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use farmlink_core::Caller;

use crate::{error::AppError, state::AppState};

// ============================================================================
// Bearer Authentication
// ============================================================================

/// The caller decoded from a `Bearer` token.
///
/// Only decodes identity. Role checks belong to the services receiving the `Caller`.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Caller);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // 1. Extract token from Authorization header
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| AppError::AuthenticationError("Authorization header required".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::AuthenticationError("Invalid authorization header format".into()))?;

        // 2. Decode and validate JWT
        let caller = state
            .tokens
            .verify(token)
            .map_err(|_| AppError::AuthenticationError("Invalid or expired token".into()))?;

        Ok(Authenticated(caller))
    }
}
