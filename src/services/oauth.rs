// SPDX-License-Identifier: MIT

//! OAuth bridge: provider handshakes and account resolution.
//!
//! One handler per provider maps the provider's raw profile payload into a
//! `CanonicalIdentity`; account resolution is then provider-independent.
//! Linking never overwrites an existing password hash or another provider's
//! id on the same account.

use serde::Deserialize;

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::User;
use crate::time_utils::format_utc_rfc3339;

/// Supported OAuth providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Google,
    Kakao,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Kakao => "kakao",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "google" => Some(Provider::Google),
            "kakao" => Some(Provider::Kakao),
            _ => None,
        }
    }
}

/// Provider-independent identity shape every provider payload reduces to.
#[derive(Debug, Clone)]
pub struct CanonicalIdentity {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub picture_url: String,
    pub provider_id: String,
    pub provider: Provider,
}

/// Google userinfo payload (`oauth2/v2/userinfo`).
#[derive(Debug, Deserialize)]
pub struct GoogleProfile {
    pub id: String,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub picture: Option<String>,
}

impl GoogleProfile {
    /// Normalize into the canonical shape. Missing optional fields become
    /// empty strings; a missing email gets a synthesized placeholder.
    pub fn into_identity(self) -> CanonicalIdentity {
        let email = match self.email {
            Some(email) if !email.is_empty() => email,
            _ => format!("{}@google.local", self.id),
        };
        CanonicalIdentity {
            email,
            first_name: self.given_name.unwrap_or_default(),
            last_name: self.family_name.unwrap_or_default(),
            picture_url: self.picture.unwrap_or_default(),
            provider_id: self.id,
            provider: Provider::Google,
        }
    }
}

/// Kakao user payload (`v2/user/me`).
#[derive(Debug, Deserialize)]
pub struct KakaoProfile {
    pub id: i64,
    #[serde(default)]
    pub kakao_account: Option<KakaoAccount>,
}

#[derive(Debug, Default, Deserialize)]
pub struct KakaoAccount {
    pub email: Option<String>,
    #[serde(default)]
    pub profile: Option<KakaoAccountProfile>,
}

#[derive(Debug, Default, Deserialize)]
pub struct KakaoAccountProfile {
    pub nickname: Option<String>,
    pub profile_image_url: Option<String>,
}

impl KakaoProfile {
    /// Normalize into the canonical shape. Kakao only exposes a nickname,
    /// which lands in `first_name`.
    pub fn into_identity(self) -> CanonicalIdentity {
        let id = self.id.to_string();
        let account = self.kakao_account.unwrap_or_default();
        let profile = account.profile.unwrap_or_default();

        let email = match account.email {
            Some(email) if !email.is_empty() => email,
            _ => format!("{}@kakao.local", id),
        };
        CanonicalIdentity {
            email,
            first_name: profile.nickname.unwrap_or_default(),
            last_name: String::new(),
            picture_url: profile.profile_image_url.unwrap_or_default(),
            provider_id: id,
            provider: Provider::Kakao,
        }
    }
}

/// Attach an identity to an existing account.
///
/// Sets the provider id only if that provider is not yet linked, fills
/// blank name/picture fields, and stamps the last login. The password hash
/// and other providers' ids are never touched.
pub fn link_identity(user: &mut User, identity: &CanonicalIdentity, now: &str) {
    let slot = match identity.provider {
        Provider::Google => &mut user.google_id,
        Provider::Kakao => &mut user.kakao_id,
    };
    if slot.is_none() {
        *slot = Some(identity.provider_id.clone());
    }

    if user.first_name.is_empty() {
        user.first_name = identity.first_name.clone();
    }
    if user.last_name.is_empty() {
        user.last_name = identity.last_name.clone();
    }
    if user.profile_image.is_none() && !identity.picture_url.is_empty() {
        user.profile_image = Some(identity.picture_url.clone());
    }

    user.last_login_at = Some(now.to_string());
    user.updated_at = now.to_string();
}

/// Build a fresh account from an identity. No password; the email counts as
/// provider-verified.
pub fn user_from_identity(identity: &CanonicalIdentity, now: &str) -> User {
    let full_name = format!("{} {}", identity.first_name, identity.last_name);
    let username = match full_name.trim() {
        "" => identity
            .email
            .split('@')
            .next()
            .unwrap_or_default()
            .to_string(),
        name => name.to_string(),
    };

    User {
        id: uuid::Uuid::new_v4().to_string(),
        email: identity.email.clone(),
        password_hash: None,
        username,
        first_name: identity.first_name.clone(),
        last_name: identity.last_name.clone(),
        profile_image: if identity.picture_url.is_empty() {
            None
        } else {
            Some(identity.picture_url.clone())
        },
        google_id: match identity.provider {
            Provider::Google => Some(identity.provider_id.clone()),
            _ => None,
        },
        kakao_id: match identity.provider {
            Provider::Kakao => Some(identity.provider_id.clone()),
            _ => None,
        },
        provider: Some(identity.provider.as_str().to_string()),
        is_email_verified: true,
        last_login_at: Some(now.to_string()),
        created_at: now.to_string(),
        updated_at: now.to_string(),
    }
}

/// OAuth token endpoint response (both providers use the same field).
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Service handling the provider handshake and account resolution.
#[derive(Clone)]
pub struct OAuthService {
    http: reqwest::Client,
    api_url: String,
    google_client_id: String,
    google_client_secret: String,
    kakao_client_id: String,
    kakao_client_secret: String,
    db: FirestoreDb,
}

impl OAuthService {
    pub fn new(
        api_url: String,
        google_client_id: String,
        google_client_secret: String,
        kakao_client_id: String,
        kakao_client_secret: String,
        db: FirestoreDb,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            google_client_id,
            google_client_secret,
            kakao_client_id,
            kakao_client_secret,
            db,
        }
    }

    fn callback_url(&self, provider: Provider) -> String {
        format!("{}/auth/{}/callback", self.api_url, provider.as_str())
    }

    /// Provider authorization URL the login flow redirects the browser to.
    pub fn authorize_url(&self, provider: Provider, state: &str) -> String {
        let callback = self.callback_url(provider);
        match provider {
            Provider::Google => format!(
                "https://accounts.google.com/o/oauth2/v2/auth?\
                 client_id={}&redirect_uri={}&response_type=code&scope=email%20profile&state={}",
                self.google_client_id,
                urlencoding::encode(&callback),
                state
            ),
            Provider::Kakao => format!(
                "https://kauth.kakao.com/oauth/authorize?\
                 client_id={}&redirect_uri={}&response_type=code&state={}",
                self.kakao_client_id,
                urlencoding::encode(&callback),
                state
            ),
        }
    }

    /// Exchange an authorization code for the provider's canonical identity.
    pub async fn fetch_identity(
        &self,
        provider: Provider,
        code: &str,
    ) -> Result<CanonicalIdentity, AppError> {
        match provider {
            Provider::Google => self.fetch_google_identity(code).await,
            Provider::Kakao => self.fetch_kakao_identity(code).await,
        }
    }

    async fn fetch_google_identity(&self, code: &str) -> Result<CanonicalIdentity, AppError> {
        let token: TokenResponse = self
            .http
            .post("https://oauth2.googleapis.com/token")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", &self.google_client_id),
                ("client_secret", &self.google_client_secret),
                ("redirect_uri", &self.callback_url(Provider::Google)),
            ])
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Google token exchange: {}", e)))?
            .error_for_status()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Google token exchange: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Google token response: {}", e)))?;

        let profile: GoogleProfile = self
            .http
            .get("https://www.googleapis.com/oauth2/v2/userinfo")
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Google profile fetch: {}", e)))?
            .error_for_status()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Google profile fetch: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Google profile payload: {}", e)))?;

        Ok(profile.into_identity())
    }

    async fn fetch_kakao_identity(&self, code: &str) -> Result<CanonicalIdentity, AppError> {
        let token: TokenResponse = self
            .http
            .post("https://kauth.kakao.com/oauth/token")
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", &self.kakao_client_id),
                ("client_secret", &self.kakao_client_secret),
                ("redirect_uri", &self.callback_url(Provider::Kakao)),
            ])
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Kakao token exchange: {}", e)))?
            .error_for_status()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Kakao token exchange: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Kakao token response: {}", e)))?;

        let profile: KakaoProfile = self
            .http
            .get("https://kapi.kakao.com/v2/user/me")
            .bearer_auth(&token.access_token)
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Kakao profile fetch: {}", e)))?
            .error_for_status()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Kakao profile fetch: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Kakao profile payload: {}", e)))?;

        Ok(profile.into_identity())
    }

    /// Resolve an identity to a local account, linking or creating as needed.
    pub async fn resolve_user(&self, identity: &CanonicalIdentity) -> Result<User, AppError> {
        let now = format_utc_rfc3339(chrono::Utc::now());

        if let Some(mut user) = self.db.find_user_by_email(&identity.email).await? {
            link_identity(&mut user, identity, &now);
            self.db.upsert_user(&user).await?;
            tracing::info!(
                user_id = %user.id,
                provider = identity.provider.as_str(),
                "OAuth identity linked to existing account"
            );
            return Ok(user);
        }

        let user = user_from_identity(identity, &now);
        self.db.create_user(&user).await?;
        tracing::info!(
            user_id = %user.id,
            provider = identity.provider.as_str(),
            "Account created from OAuth identity"
        );
        Ok(user)
    }
}
