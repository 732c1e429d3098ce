// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup; there is no runtime reloading.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL for OAuth redirects and CORS
    pub frontend_url: String,
    /// Public base URL of this API (used to build OAuth callback URLs)
    pub api_url: String,
    /// True when running in production (tightens cookie attributes)
    pub production: bool,
    /// GCP project ID for Firestore
    pub gcp_project_id: String,

    /// JWT signing key for access tokens (raw bytes)
    pub jwt_secret: Vec<u8>,
    /// Access token lifetime in minutes
    pub access_token_ttl_minutes: i64,
    /// Refresh token lifetime in days
    pub refresh_token_ttl_days: i64,
    /// HMAC key for signing the OAuth state parameter
    pub oauth_state_key: Vec<u8>,

    /// Google OAuth client ID
    pub google_client_id: String,
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// Kakao OAuth client ID (REST API key)
    pub kakao_client_id: String,
    /// Kakao OAuth client secret
    pub kakao_client_secret: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            api_url: env::var("API_URL").unwrap_or_else(|_| "http://localhost:8080".to_string()),
            production: env::var("APP_ENV").map(|v| v == "production").unwrap_or(false),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),

            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| ConfigError::Missing("JWT_SECRET"))?
                .into_bytes(),
            access_token_ttl_minutes: env::var("ACCESS_TOKEN_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            refresh_token_ttl_days: env::var("REFRESH_TOKEN_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(7),
            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map_err(|_| ConfigError::Missing("OAUTH_STATE_KEY"))?
                .into_bytes(),

            google_client_id: env::var("GOOGLE_CLIENT_ID").unwrap_or_default(),
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default(),
            kakao_client_id: env::var("KAKAO_CLIENT_ID").unwrap_or_default(),
            kakao_client_secret: env::var("KAKAO_CLIENT_SECRET").unwrap_or_default(),
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            api_url: "http://localhost:8080".to_string(),
            production: false,
            gcp_project_id: "test-project".to_string(),
            jwt_secret: b"test_jwt_key_32_bytes_minimum!!!".to_vec(),
            access_token_ttl_minutes: 60,
            refresh_token_ttl_days: 7,
            oauth_state_key: b"test_oauth_state_key".to_vec(),
            google_client_id: "test_google_id".to_string(),
            google_client_secret: "test_google_secret".to_string(),
            kakao_client_id: "test_kakao_id".to_string(),
            kakao_client_secret: "test_kakao_secret".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::test_default();

        assert_eq!(config.port, 8080);
        assert_eq!(config.access_token_ttl_minutes, 60);
        assert_eq!(config.refresh_token_ttl_days, 7);
        assert!(!config.production);
    }
}
