// SPDX-License-Identifier: MIT

//! Local account management: registration, credential checks, profile CRUD.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::User;
use crate::time_utils::format_utc_rfc3339;

/// Fields a user may change on their own account.
#[derive(Debug, Default)]
pub struct AccountUpdate {
    pub username: Option<String>,
    pub password: Option<String>,
    pub profile_image: Option<String>,
}

#[derive(Clone)]
pub struct AccountService {
    db: FirestoreDb,
}

impl AccountService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Register a local account. Duplicate email is a `Conflict`.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: &str,
        profile_image: Option<String>,
    ) -> Result<User, AppError> {
        let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?;

        let now = format_utc_rfc3339(chrono::Utc::now());
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: Some(hash),
            username: username.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            profile_image,
            google_id: None,
            kakao_id: None,
            provider: None,
            is_email_verified: false,
            last_login_at: None,
            created_at: now.clone(),
            updated_at: now,
        };

        self.db.create_user(&user).await?;
        tracing::info!(user_id = %user.id, "Account registered");
        Ok(user)
    }

    /// Check an email/password pair.
    ///
    /// Unknown email is `NotFound`; a wrong password, or a password login
    /// against an OAuth-only account, is `Unauthorized`.
    pub async fn validate_credentials(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = self
            .db
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("no account for {}", email)))?;

        let Some(hash) = user.password_hash.as_deref() else {
            return Err(AppError::Unauthorized);
        };

        let valid = bcrypt::verify(password, hash)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password check failed: {}", e)))?;
        if !valid {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Fetch a user or fail with `NotFound`.
    pub async fn get_user(&self, user_id: &str) -> Result<User, AppError> {
        self.db
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {} not found", user_id)))
    }

    /// Apply profile changes. A new password is re-hashed before storage.
    pub async fn update_user(&self, user_id: &str, update: AccountUpdate) -> Result<User, AppError> {
        let mut user = self.get_user(user_id).await?;

        if let Some(username) = update.username {
            if username.is_empty() {
                return Err(AppError::BadRequest("username must not be empty".to_string()));
            }
            user.username = username;
        }
        if let Some(password) = update.password {
            let hash = bcrypt::hash(&password, bcrypt::DEFAULT_COST).map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e))
            })?;
            user.password_hash = Some(hash);
        }
        if let Some(profile_image) = update.profile_image {
            user.profile_image = Some(profile_image);
        }

        user.updated_at = format_utc_rfc3339(chrono::Utc::now());
        self.db.upsert_user(&user).await?;
        Ok(user)
    }

    /// Delete an account. `NotFound` when it does not exist.
    pub async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        // Existence check first so deletion of an unknown id is a 404
        self.get_user(user_id).await?;
        self.db.delete_user(user_id).await?;
        tracing::info!(user_id, "Account deleted");
        Ok(())
    }
}
