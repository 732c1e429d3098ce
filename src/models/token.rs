// SPDX-License-Identifier: MIT

//! Refresh token records.

use serde::{Deserialize, Serialize};

/// A persisted refresh token.
///
/// Tokens are soft-revoked by flipping `is_active` rather than deleted, so
/// the collection doubles as an audit trail of issued sessions. A token is
/// valid only while `is_active` and the expiry has not passed. A user may
/// hold several active tokens at once (multi-device).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    /// Opaque token value (UUID), also the document ID
    pub token: String,
    /// Owning user ID
    pub user_id: String,
    /// Absolute expiry (RFC 3339)
    pub expires_at: String,
    /// When the token was issued (RFC 3339)
    pub created_at: String,
    /// Whether the token can still be redeemed
    pub is_active: bool,
    /// User-Agent header captured at issuance
    pub user_agent: Option<String>,
    /// Client IP captured at issuance
    pub ip_address: Option<String>,
}

impl RefreshToken {
    /// Whether this token can be redeemed at `now` (RFC 3339 ordering is
    /// lexicographic for normalized timestamps).
    pub fn is_valid_at(&self, now: &str) -> bool {
        self.is_active && now < self.expires_at.as_str()
    }
}
