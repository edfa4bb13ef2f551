/**
 * Authentication Middleware
 *
 * Verifies the bearer token on protected routes and attaches the
 * principal `{user_id, role_id}` to the request. Everything behind this
 * layer trusts that principal; tokens are never re-read downstream.
 */

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::backend::auth::sessions::verify_token;
use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;

/// Principal extracted from a verified token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub role_id: String,
}

impl AuthenticatedUser {
    pub fn new(user_id: impl Into<String>, role_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            role_id: role_id.into(),
        }
    }
}

/// Authentication middleware
///
/// 1. Reads `Authorization: Bearer <token>`
/// 2. Verifies the token against the configured secret
/// 3. Attaches [`AuthenticatedUser`] to the request extensions
///
/// Returns 401 Unauthorized if the token is missing or invalid.
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = bearer_token(&request)?;

    let claims = verify_token(token, &app_state.config.jwt_secret).map_err(|e| {
        tracing::warn!("[Auth] Invalid token: {:?}", e);
        StatusCode::UNAUTHORIZED
    })?;

    if claims.sub.is_empty() {
        tracing::warn!("[Auth] Token without subject");
        return Err(StatusCode::UNAUTHORIZED);
    }

    request
        .extensions_mut()
        .insert(AuthenticatedUser::new(claims.sub, claims.role_id));

    Ok(next.run(request).await)
}

fn bearer_token(request: &Request) -> Result<&str, StatusCode> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("[Auth] Missing Authorization header");
            StatusCode::UNAUTHORIZED
        })?;

    auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        tracing::warn!("[Auth] Invalid Authorization header format");
        StatusCode::UNAUTHORIZED
    })
}

/// Extract authenticated user from request extensions
pub fn extract_authenticated_user(request: &Request) -> Result<AuthenticatedUser, StatusCode> {
    request
        .extensions()
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or_else(|| {
            tracing::warn!("[Auth] AuthenticatedUser not found in request extensions");
            StatusCode::UNAUTHORIZED
        })
}

/// Axum extractor for the authenticated user
///
/// Rejects with a 401 JSON error when the auth layer did not run or found
/// no principal.
#[derive(Clone, Debug)]
pub struct AuthUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = BackendError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| BackendError::handler(StatusCode::UNAUTHORIZED, "authentication required"))
    }
}
