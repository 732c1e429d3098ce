// SPDX-License-Identifier: MIT

//! JWT authentication middleware.

use crate::error::AppError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Cookie carrying the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
/// Cookie carrying the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Authenticated user extracted from the access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

/// Middleware that requires a valid access token.
///
/// The token is read from the `access_token` cookie first, then from the
/// `Authorization: Bearer` header. A missing access token with a refresh
/// cookie still present maps to `TokenExpired` so the client knows a
/// refresh attempt is worthwhile.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = if let Some(cookie) = jar.get(ACCESS_TOKEN_COOKIE) {
        cookie.value().to_string()
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header {
            Some(h) if h.starts_with("Bearer ") => h[7..].to_string(),
            _ => {
                return Err(if jar.get(REFRESH_TOKEN_COOKIE).is_some() {
                    AppError::TokenExpired
                } else {
                    AppError::Unauthorized
                });
            }
        }
    };

    let user_id = state.sessions.validate_access_token(&token)?;

    request.extensions_mut().insert(AuthUser { user_id });
    Ok(next.run(request).await)
}
