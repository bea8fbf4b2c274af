use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use esign_types::api::Claims;
use esign_types::models::Role;

use crate::auth::AppState;
use crate::error::ApiError;

/// Extract and validate JWT from Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let missing = || ApiError::Unauthorized("missing or invalid token".into());

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or_else(missing)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| missing())?;

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}

/// Reject non-admin callers. Must run after `require_auth`.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| ApiError::Unauthorized("missing or invalid token".into()))?;

    if claims.role != Role::Admin {
        return Err(ApiError::Forbidden("administrator access required".into()));
    }

    Ok(next.run(req).await)
}
