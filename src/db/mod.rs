// SPDX-License-Identifier: MIT

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Email uniqueness guard documents, keyed by email address
    pub const USER_EMAILS: &str = "user_emails";
    /// Refresh tokens, keyed by the opaque token value. Soft-revoked, never
    /// deleted (audit trail).
    pub const REFRESH_TOKENS: &str = "refresh_tokens";
    pub const QUIZ_SETS: &str = "quiz_sets";
    pub const QUIZ_CARDS: &str = "quiz_cards";
    /// Progress records keyed by `{user_id}_{quiz_set_id}`
    pub const QUIZ_PROGRESS: &str = "quiz_progress";
    /// User stats aggregates (keyed by user id)
    pub const USER_STATS: &str = "user_stats";
}
