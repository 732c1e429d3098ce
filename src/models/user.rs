// SPDX-License-Identifier: MIT

//! User account model for storage and API.

use serde::{Deserialize, Serialize};

/// User account stored in Firestore.
///
/// An account must have at least one way to authenticate: a password hash,
/// a provider id, or both. The password hash is never serialized into API
/// responses (see `UserProfile`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUID, also used as the document ID
    pub id: String,
    /// Email address (unique across accounts)
    pub email: String,
    /// bcrypt hash; None for OAuth-only accounts
    pub password_hash: Option<String>,
    /// Display name
    pub username: String,
    /// First name (may be empty for local accounts)
    #[serde(default)]
    pub first_name: String,
    /// Last name
    #[serde(default)]
    pub last_name: String,
    /// Profile picture URL
    pub profile_image: Option<String>,
    /// Google account ID, set once the account is linked
    pub google_id: Option<String>,
    /// Kakao account ID, set once the account is linked
    pub kakao_id: Option<String>,
    /// Provider that created the account ("google", "kakao"), if any
    pub provider: Option<String>,
    /// True for OAuth-created accounts (provider-verified email)
    #[serde(default)]
    pub is_email_verified: bool,
    /// Last login timestamp (RFC 3339); cleared on full logout
    pub last_login_at: Option<String>,
    /// When the account was created (RFC 3339)
    pub created_at: String,
    /// Last modification timestamp (RFC 3339)
    pub updated_at: String,
}

/// User profile returned by the API. Deliberately omits the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_image: Option<String>,
    pub is_email_verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            profile_image: user.profile_image,
            is_email_verified: user.is_email_verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}
