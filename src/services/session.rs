// SPDX-License-Identifier: MIT

//! Session manager: access/refresh token issuance, validation and revocation.
//!
//! Access tokens are short-lived HS256 JWTs validated statelessly. Refresh
//! tokens are opaque UUIDs backed by the refresh token store; they are not
//! rotated on use and stay valid until their own expiry or an explicit
//! revocation. The manager is transport-agnostic: it hands back token values
//! and expiry instants, and the route layer owns the cookies.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::RefreshToken;
use crate::time_utils::format_utc_rfc3339;

/// JWT claims. `sub` is the user id; nothing else is trusted for
/// authorization decisions.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// A freshly issued token pair with expiry instants for cookie attributes.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Request metadata captured with each refresh token for the audit trail.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

#[derive(Clone)]
pub struct SessionService {
    jwt_secret: Vec<u8>,
    access_ttl: Duration,
    refresh_ttl: Duration,
    db: FirestoreDb,
}

impl SessionService {
    pub fn new(
        jwt_secret: Vec<u8>,
        access_ttl_minutes: i64,
        refresh_ttl_days: i64,
        db: FirestoreDb,
    ) -> Self {
        Self {
            jwt_secret,
            access_ttl: Duration::minutes(access_ttl_minutes),
            refresh_ttl: Duration::days(refresh_ttl_days),
            db,
        }
    }

    /// Sign an access token for a user.
    pub fn create_access_token(&self, user_id: &str) -> Result<(String, DateTime<Utc>), AppError> {
        let now = Utc::now();
        let expires_at = now + self.access_ttl;

        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp() as usize,
            exp: expires_at.timestamp() as usize,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.jwt_secret),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

        Ok((token, expires_at))
    }

    /// Validate an access token and return the user id it asserts.
    ///
    /// Expiry and malformedness are distinct failures so callers can decide
    /// whether a refresh attempt makes sense.
    pub fn validate_access_token(&self, token: &str) -> Result<String, AppError> {
        let key = DecodingKey::from_secret(&self.jwt_secret);
        let mut validation = Validation::new(Algorithm::HS256);
        // No leeway: a token past its expiry instant is expired, full stop.
        validation.leeway = 0;

        decode::<Claims>(token, &key, &validation)
            .map(|data| data.claims.sub)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => AppError::InvalidToken,
            })
    }

    /// Issue an access token plus a fresh persisted refresh token.
    pub async fn issue_token_pair(
        &self,
        user_id: &str,
        client: ClientInfo,
    ) -> Result<TokenPair, AppError> {
        let (access_token, access_expires_at) = self.create_access_token(user_id)?;

        let now = Utc::now();
        let refresh_expires_at = now + self.refresh_ttl;
        let refresh_token = Uuid::new_v4().to_string();

        let record = RefreshToken {
            token: refresh_token.clone(),
            user_id: user_id.to_string(),
            expires_at: format_utc_rfc3339(refresh_expires_at),
            created_at: format_utc_rfc3339(now),
            is_active: true,
            user_agent: client.user_agent,
            ip_address: client.ip_address,
        };
        self.db.create_refresh_token(&record).await?;

        tracing::debug!(user_id, "Issued token pair");

        Ok(TokenPair {
            access_token,
            access_expires_at,
            refresh_token,
            refresh_expires_at,
        })
    }

    /// Mint a new access token from a refresh token.
    ///
    /// The refresh token is not rotated; it remains valid until its own
    /// expiry or an explicit revocation. Any lookup miss is `Unauthorized`,
    /// never an internal error.
    pub async fn refresh(
        &self,
        refresh_token: &str,
    ) -> Result<(String, DateTime<Utc>, String), AppError> {
        let record = self
            .db
            .find_active_refresh_token(refresh_token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let now = format_utc_rfc3339(Utc::now());
        if !record.is_valid_at(&now) {
            return Err(AppError::Unauthorized);
        }

        let (access_token, expires_at) = self.create_access_token(&record.user_id)?;
        tracing::debug!(user_id = %record.user_id, "Access token refreshed");
        Ok((access_token, expires_at, record.user_id))
    }

    /// Revoke every active refresh token for a user (full logout / password
    /// change) and clear the cached last-login marker.
    pub async fn revoke_user(&self, user_id: &str) -> Result<usize, AppError> {
        let count = self.db.deactivate_user_refresh_tokens(user_id).await?;

        if let Some(mut user) = self.db.get_user(user_id).await? {
            user.last_login_at = None;
            user.updated_at = format_utc_rfc3339(Utc::now());
            self.db.upsert_user(&user).await?;
        }

        Ok(count)
    }

    /// Revoke a single refresh token. Idempotent: revoking a missing or
    /// already-inactive token is not an error.
    pub async fn revoke_token(&self, refresh_token: &str) -> Result<(), AppError> {
        self.db.deactivate_refresh_token(refresh_token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::FirestoreDb;

    fn service() -> SessionService {
        SessionService::new(
            b"test_jwt_key_32_bytes_minimum!!!".to_vec(),
            60,
            7,
            FirestoreDb::new_mock(),
        )
    }

    #[test]
    fn test_access_token_roundtrip() {
        let sessions = service();
        let (token, _) = sessions.create_access_token("user-1").unwrap();
        let user_id = sessions.validate_access_token(&token).unwrap();
        assert_eq!(user_id, "user-1");
    }

    #[test]
    fn test_garbage_token_is_invalid_not_expired() {
        let sessions = service();
        let err = sessions.validate_access_token("not.a.jwt").unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[test]
    fn test_wrong_key_is_invalid() {
        let sessions = service();
        let other = SessionService::new(
            b"another_key_that_is_long_enough!".to_vec(),
            60,
            7,
            FirestoreDb::new_mock(),
        );
        let (token, _) = other.create_access_token("user-1").unwrap();
        let err = sessions.validate_access_token(&token).unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[test]
    fn test_expired_token_is_expired_not_invalid() {
        // TTL of -5 minutes produces an already-expired token.
        let sessions = SessionService::new(
            b"test_jwt_key_32_bytes_minimum!!!".to_vec(),
            -5,
            7,
            FirestoreDb::new_mock(),
        );
        let (token, _) = sessions.create_access_token("user-1").unwrap();

        let err = sessions.validate_access_token(&token).unwrap_err();
        assert!(matches!(err, AppError::TokenExpired));
    }
}
