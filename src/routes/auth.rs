// SPDX-License-Identifier: MIT

//! Authentication routes: local register/login, session refresh, logout,
//! and the Google/Kakao OAuth flows.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Redirect,
    routing::{get, post},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::services::account::AccountUpdate;
use crate::services::oauth::Provider;
use crate::services::session::{ClientInfo, TokenPair};
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/refresh", post(refresh))
        .route("/auth/{provider}", get(oauth_start))
        .route("/auth/{provider}/callback", get(oauth_callback))
}

/// Routes mounted behind the auth middleware.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/auth/me",
            get(get_me).patch(update_me).delete(delete_me),
        )
        .route("/auth/logout-all", post(logout_all))
}

// ─── Cookies ─────────────────────────────────────────────────

/// Build an auth cookie. Secure and SameSite=Strict in production,
/// SameSite=Lax otherwise; always HttpOnly and scoped to the root path.
fn auth_cookie(
    name: &'static str,
    value: String,
    expires_at: DateTime<Utc>,
    production: bool,
) -> Cookie<'static> {
    let max_age = (expires_at - Utc::now()).num_seconds().max(0);
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(production)
        .same_site(if production {
            SameSite::Strict
        } else {
            SameSite::Lax
        })
        .max_age(time::Duration::seconds(max_age))
        .build()
}

/// Removal cookie matching the creation attributes, so browsers drop it.
fn removal_cookie(name: &'static str, production: bool) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .http_only(true)
        .secure(production)
        .same_site(if production {
            SameSite::Strict
        } else {
            SameSite::Lax
        })
        .max_age(time::Duration::ZERO)
        .build()
}

/// Attach both session cookies to the jar.
fn with_session_cookies(jar: CookieJar, pair: &TokenPair, production: bool) -> CookieJar {
    jar.add(auth_cookie(
        ACCESS_TOKEN_COOKIE,
        pair.access_token.clone(),
        pair.access_expires_at,
        production,
    ))
    .add(auth_cookie(
        REFRESH_TOKEN_COOKIE,
        pair.refresh_token.clone(),
        pair.refresh_expires_at,
        production,
    ))
}

fn without_session_cookies(jar: CookieJar, production: bool) -> CookieJar {
    jar.add(removal_cookie(ACCESS_TOKEN_COOKIE, production))
        .add(removal_cookie(REFRESH_TOKEN_COOKIE, production))
}

/// Request metadata stored with each refresh token.
fn client_info(headers: &HeaderMap) -> ClientInfo {
    ClientInfo {
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string()),
        ip_address: headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(|s| s.trim().to_string()),
    }
}

// ─── Local Accounts ──────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 1))]
    pub username: String,
    pub profile_image: Option<String>,
}

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Minimal identity payload returned by register/login.
#[derive(Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub email: String,
    pub username: String,
}

/// Register a local account and open a session for it.
async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse>)> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user = state
        .accounts
        .register(&body.email, &body.password, &body.username, body.profile_image)
        .await?;

    let pair = state
        .sessions
        .issue_token_pair(&user.id, client_info(&headers))
        .await?;
    let jar = with_session_cookies(jar, &pair, state.config.production);

    Ok((
        StatusCode::CREATED,
        jar,
        Json(SessionResponse {
            id: user.id,
            email: user.email,
            username: user.username,
        }),
    ))
}

/// Password login.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let user = state
        .accounts
        .validate_credentials(&body.email, &body.password)
        .await?;

    let pair = state
        .sessions
        .issue_token_pair(&user.id, client_info(&headers))
        .await?;
    let jar = with_session_cookies(jar, &pair, state.config.production);

    // A login counts as study activity for the streak. The session is
    // already established, so a stats-store failure must not fail the
    // login; the streak self-heals on the next completion or resync.
    if let Err(e) = state.progress.touch_streak(&user.id).await {
        tracing::warn!(user_id = %user.id, error = %e, "Streak update on login failed");
    }

    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        jar,
        Json(SessionResponse {
            id: user.id,
            email: user.email,
            username: user.username,
        }),
    ))
}

/// Logout of this session: deactivate the presented refresh token (if any)
/// and strip both cookies. Safe to call without cookies.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(StatusCode, CookieJar)> {
    if let Some(cookie) = jar.get(REFRESH_TOKEN_COOKIE) {
        state.sessions.revoke_token(cookie.value()).await?;
    }

    let jar = without_session_cookies(jar, state.config.production);
    Ok((StatusCode::NO_CONTENT, jar))
}

/// Logout everywhere: revoke every active refresh token for the user.
async fn logout_all(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(StatusCode, CookieJar)> {
    let revoked = state.sessions.revoke_user(&user.user_id).await?;
    tracing::info!(user_id = %user.user_id, revoked, "Full logout");

    let jar = without_session_cookies(jar, state.config.production);
    Ok((StatusCode::NO_CONTENT, jar))
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub user_id: String,
}

/// Mint a new access token from the refresh cookie.
async fn refresh(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<RefreshResponse>)> {
    let refresh_token = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthorized)?;

    let (access_token, expires_at, user_id) = state.sessions.refresh(&refresh_token).await?;

    let jar = jar.add(auth_cookie(
        ACCESS_TOKEN_COOKIE,
        access_token,
        expires_at,
        state.config.production,
    ));

    Ok((
        jar,
        Json(RefreshResponse {
            success: true,
            user_id,
        }),
    ))
}

/// Current user profile (password hash never included).
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<crate::models::UserProfile>> {
    let profile = state.accounts.get_user(&user.user_id).await?;
    Ok(Json(profile.into()))
}

#[derive(Deserialize, Validate)]
pub struct UpdateMeRequest {
    pub username: Option<String>,
    #[validate(length(min = 8))]
    pub password: Option<String>,
    pub profile_image: Option<String>,
}

/// Update own profile. A password change revokes every other session.
async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<UpdateMeRequest>,
) -> Result<Json<crate::models::UserProfile>> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let password_changed = body.password.is_some();
    let updated = state
        .accounts
        .update_user(
            &user.user_id,
            AccountUpdate {
                username: body.username,
                password: body.password,
                profile_image: body.profile_image,
            },
        )
        .await?;

    if password_changed {
        state.sessions.revoke_user(&user.user_id).await?;
    }

    Ok(Json(updated.into()))
}

/// Delete own account: revoke every session, drop the user record, and
/// clear the cookies.
async fn delete_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(StatusCode, CookieJar)> {
    state.sessions.revoke_user(&user.user_id).await?;
    state.accounts.delete_user(&user.user_id).await?;

    let jar = without_session_cookies(jar, state.config.production);
    Ok((StatusCode::NO_CONTENT, jar))
}

// ─── OAuth ───────────────────────────────────────────────────

/// Sign an OAuth state value: "provider|timestamp_hex|signature_hex",
/// base64url-encoded for the query string.
fn sign_state(provider: Provider, key: &[u8]) -> Result<String> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();

    let payload = format!("{}|{:x}", provider.as_str(), timestamp);

    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());

    Ok(URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature)))
}

/// Verify the state parameter and return the provider it was issued for.
fn verify_state(state: &str, key: &[u8]) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }
    let (provider, timestamp_hex, signature_hex) = (parts[0], parts[1], parts[2]);

    let payload = format!("{}|{}", provider, timestamp_hex);
    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if signature_hex != expected {
        tracing::error!("OAuth state signature mismatch, possible tampering");
        return None;
    }

    Some(provider.to_string())
}

/// Start the provider flow: redirect the browser to the authorization page.
async fn oauth_start(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
) -> Result<Redirect> {
    let provider = Provider::parse(&provider)
        .ok_or_else(|| AppError::BadRequest(format!("unknown provider: {}", provider)))?;

    let oauth_state = sign_state(provider, &state.config.oauth_state_key)?;
    let url = state.oauth.authorize_url(provider, &oauth_state);

    tracing::info!(provider = provider.as_str(), "Starting OAuth flow");
    Ok(Redirect::temporary(&url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Provider callback: exchange the code, resolve the account, open a
/// session, and bounce back to the frontend. All failures surface as a
/// frontend error redirect rather than an API error page.
async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    jar: CookieJar,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Redirect)> {
    let provider = Provider::parse(&provider)
        .ok_or_else(|| AppError::BadRequest(format!("unknown provider: {}", provider)))?;

    let error_redirect = format!(
        "{}/login?error={}_login_failed",
        state.config.frontend_url,
        provider.as_str()
    );

    if let Some(error) = params.error {
        tracing::warn!(provider = provider.as_str(), error = %error, "OAuth error from provider");
        return Ok((jar, Redirect::temporary(&error_redirect)));
    }

    let (Some(code), Some(oauth_state)) = (params.code, params.state) else {
        tracing::warn!(provider = provider.as_str(), "OAuth callback missing code or state");
        return Ok((jar, Redirect::temporary(&error_redirect)));
    };

    match verify_state(&oauth_state, &state.config.oauth_state_key) {
        Some(issued_for) if issued_for == provider.as_str() => {}
        _ => {
            tracing::warn!(provider = provider.as_str(), "Invalid OAuth state parameter");
            return Ok((jar, Redirect::temporary(&error_redirect)));
        }
    }

    let user = match state.oauth.fetch_identity(provider, &code).await {
        Ok(identity) => match state.oauth.resolve_user(&identity).await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!(provider = provider.as_str(), error = %e, "OAuth account resolution failed");
                return Ok((jar, Redirect::temporary(&error_redirect)));
            }
        },
        Err(e) => {
            tracing::error!(provider = provider.as_str(), error = %e, "OAuth profile exchange failed");
            return Ok((jar, Redirect::temporary(&error_redirect)));
        }
    };

    let pair = state
        .sessions
        .issue_token_pair(&user.id, client_info(&headers))
        .await?;
    let jar = with_session_cookies(jar, &pair, state.config.production);

    // Non-fatal: the session is minted, the browser still gets its
    // success redirect even if the streak write fails.
    if let Err(e) = state.progress.touch_streak(&user.id).await {
        tracing::warn!(user_id = %user.id, error = %e, "Streak update on OAuth login failed");
    }

    tracing::info!(user_id = %user.id, provider = provider.as_str(), "OAuth login complete");

    let success_redirect = format!(
        "{}/auth/{}success",
        state.config.frontend_url,
        provider.as_str()
    );
    Ok((jar, Redirect::temporary(&success_redirect)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_roundtrip() {
        let key = b"state_key";
        let signed = sign_state(Provider::Google, key).unwrap();
        assert_eq!(verify_state(&signed, key), Some("google".to_string()));
    }

    #[test]
    fn test_state_rejects_wrong_key() {
        let signed = sign_state(Provider::Kakao, b"key_a").unwrap();
        assert_eq!(verify_state(&signed, b"key_b"), None);
    }

    #[test]
    fn test_state_rejects_malformed() {
        let encoded = URL_SAFE_NO_PAD.encode("google|only-two-parts");
        assert_eq!(verify_state(&encoded, b"key"), None);
        assert_eq!(verify_state("not base64 at all!!", b"key"), None);
    }

    #[test]
    fn test_auth_cookie_attributes_dev() {
        let cookie = auth_cookie(
            ACCESS_TOKEN_COOKIE,
            "tok".to_string(),
            Utc::now() + chrono::Duration::hours(1),
            false,
        );
        let s = cookie.to_string();
        assert!(s.contains("Path=/"));
        assert!(s.contains("HttpOnly"));
        assert!(s.contains("SameSite=Lax"));
        assert!(!s.contains("Secure"));
    }

    #[test]
    fn test_auth_cookie_attributes_production() {
        let cookie = auth_cookie(
            REFRESH_TOKEN_COOKIE,
            "tok".to_string(),
            Utc::now() + chrono::Duration::days(7),
            true,
        );
        let s = cookie.to_string();
        assert!(s.contains("SameSite=Strict"));
        assert!(s.contains("Secure"));
    }
}
