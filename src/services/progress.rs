// SPDX-License-Identifier: MIT

//! Progress tracker: quiz-set study lifecycle and streak bookkeeping.
//!
//! The state transitions themselves live on the models (`QuizProgress`,
//! `UserStats`); the db layer runs each progress+stats pair in one
//! transaction. This service is the component boundary the routes talk to.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{QuizProgress, UserStats};
use crate::time_utils::{format_utc_rfc3339, today_utc};

#[derive(Clone)]
pub struct ProgressService {
    db: FirestoreDb,
}

impl ProgressService {
    pub fn new(db: FirestoreDb) -> Self {
        Self { db }
    }

    /// Record that a user started (or re-started) a quiz set.
    pub async fn start(
        &self,
        user_id: &str,
        quiz_set_id: &str,
        quiz_set_name: &str,
    ) -> Result<QuizProgress, AppError> {
        self.db
            .start_quiz_progress(user_id, quiz_set_id, quiz_set_name)
            .await
    }

    /// Record a completion. Idempotent; `NotFound` when never started.
    pub async fn complete(
        &self,
        user_id: &str,
        quiz_set_id: &str,
    ) -> Result<QuizProgress, AppError> {
        self.db.complete_quiz_progress(user_id, quiz_set_id).await
    }

    /// Drop a progress record entirely. `NotFound` when absent.
    pub async fn remove(&self, user_id: &str, quiz_set_id: &str) -> Result<(), AppError> {
        self.db.remove_quiz_progress(user_id, quiz_set_id).await
    }

    /// Current stats aggregate; a user with no recorded activity gets the
    /// zeroed default.
    pub async fn stats(&self, user_id: &str) -> Result<UserStats, AppError> {
        Ok(self.db.get_user_stats(user_id).await?.unwrap_or_default())
    }

    /// All progress records for a user.
    pub async fn all_progress(&self, user_id: &str) -> Result<Vec<QuizProgress>, AppError> {
        self.db.list_progress(user_id).await
    }

    /// Only the quiz sets the user currently has open.
    pub async fn in_progress(&self, user_id: &str) -> Result<Vec<QuizProgress>, AppError> {
        self.db.list_in_progress(user_id).await
    }

    /// Rebuild the cached counters from the progress rows.
    pub async fn resync(&self, user_id: &str) -> Result<UserStats, AppError> {
        self.db.resync_user_stats(user_id).await
    }

    /// Explicit stats reset; the only operation that zeroes a streak.
    pub async fn reset(&self, user_id: &str) -> Result<UserStats, AppError> {
        let now = format_utc_rfc3339(chrono::Utc::now());
        let mut stats = self.db.get_user_stats(user_id).await?.unwrap_or_default();
        stats.reset(&now);
        self.db.set_user_stats(user_id, &stats).await?;
        tracing::info!(user_id, "User stats reset");
        Ok(stats)
    }

    /// Count a login as study activity for streak purposes.
    pub async fn touch_streak(&self, user_id: &str) -> Result<UserStats, AppError> {
        let now = format_utc_rfc3339(chrono::Utc::now());
        let mut stats = self.db.get_user_stats(user_id).await?.unwrap_or_default();
        stats.update_streak(today_utc(), &now);
        self.db.set_user_stats(user_id, &stats).await?;
        Ok(stats)
    }
}
