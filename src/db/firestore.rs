// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (accounts, unique by email)
//! - Refresh tokens (soft-revoked session credentials)
//! - Quiz sets and cards
//! - Quiz progress and user stats aggregates
//!
//! Every progress mutation and its matching stats update run inside one
//! read-write transaction (`run_transaction`): the documents are read
//! through the transaction-bound client, so a concurrent commit touching
//! them aborts and retries instead of losing a counter update. Email
//! uniqueness is enforced the same way, via guard documents in
//! `user_emails`.

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    ProgressStatus, QuizCard, QuizProgress, QuizSet, RefreshToken, User, UserStats,
};
use crate::time_utils::{format_utc_rfc3339, today_utc};
use futures_util::{stream, FutureExt, StreamExt};
use serde::{Deserialize, Serialize};

const MAX_CONCURRENT_DB_OPS: usize = 50;

/// Uniqueness guard document, keyed by email address.
///
/// Firestore has no unique constraints; creating this document inside the
/// same transaction as the user document makes duplicate registration a
/// transaction conflict instead of a race.
#[derive(Debug, Serialize, Deserialize)]
struct EmailIndexEntry {
    user_id: String,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated
        // connection to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by email address.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.to_string();
        let users: Vec<User> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.field("email").eq(email.clone()))
            .limit(1)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(users.into_iter().next())
    }

    /// Create a user, enforcing email uniqueness.
    ///
    /// The email index document is read and written inside one transaction,
    /// so two concurrent registrations for the same address conflict and
    /// exactly one wins; the loser sees `Conflict`.
    pub async fn create_user(&self, user: &User) -> Result<(), AppError> {
        let client = self.get_client()?;

        let outcome: Result<(), AppError> = client
            .run_transaction(|db, transaction| {
                let user = user.clone();
                async move {
                    let claimed: Option<EmailIndexEntry> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USER_EMAILS)
                        .obj()
                        .one(&user.email)
                        .await?;

                    if claimed.is_some() {
                        return Ok(Err(AppError::Conflict(format!(
                            "email {} is already registered",
                            user.email
                        ))));
                    }

                    db.fluent()
                        .update()
                        .in_col(collections::USER_EMAILS)
                        .document_id(&user.email)
                        .object(&EmailIndexEntry {
                            user_id: user.id.clone(),
                        })
                        .add_to_transaction(transaction)?;

                    db.fluent()
                        .update()
                        .in_col(collections::USERS)
                        .document_id(&user.id)
                        .object(&user)
                        .add_to_transaction(transaction)?;

                    Ok(Ok(()))
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("User creation failed: {}", e)))?;
        outcome?;

        tracing::info!(user_id = %user.id, "User created");
        Ok(())
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Delete a user account, releasing its email for re-registration.
    pub async fn delete_user(&self, user_id: &str) -> Result<(), AppError> {
        let user = self.get_user(user_id).await?;
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        if let Some(user) = &user {
            client
                .fluent()
                .delete()
                .from(collections::USER_EMAILS)
                .document_id(&user.email)
                .add_to_transaction(&mut transaction)
                .map_err(|e| AppError::Database(format!("Failed to delete email index: {}", e)))?;
        }

        client
            .fluent()
            .delete()
            .from(collections::USERS)
            .document_id(user_id)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to delete user: {}", e)))?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;
        Ok(())
    }

    // ─── Refresh Token Operations ────────────────────────────────

    /// Persist a newly issued refresh token.
    pub async fn create_refresh_token(&self, token: &RefreshToken) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::REFRESH_TOKENS)
            .document_id(&token.token)
            .object(token)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Look up a refresh token that is still marked active.
    ///
    /// Expiry is checked by the caller; this only filters on the flag.
    pub async fn find_active_refresh_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshToken>, AppError> {
        let record: Option<RefreshToken> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::REFRESH_TOKENS)
            .obj()
            .one(token)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(record.filter(|t| t.is_active))
    }

    /// Deactivate one refresh token. Idempotent: a missing or already
    /// inactive token is not an error.
    pub async fn deactivate_refresh_token(&self, token: &str) -> Result<(), AppError> {
        let record: Option<RefreshToken> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::REFRESH_TOKENS)
            .obj()
            .one(token)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(mut record) = record {
            if record.is_active {
                record.is_active = false;
                self.create_refresh_token(&record).await?;
                tracing::debug!(user_id = %record.user_id, "Refresh token deactivated");
            }
        }
        Ok(())
    }

    /// Deactivate every active refresh token belonging to a user
    /// (full logout / password change). Returns the number revoked.
    pub async fn deactivate_user_refresh_tokens(&self, user_id: &str) -> Result<usize, AppError> {
        let uid = user_id.to_string();
        let tokens: Vec<RefreshToken> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::REFRESH_TOKENS)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(uid.clone()),
                    q.field("is_active").eq(true),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let count = tokens.len();
        let client = self.get_client()?;

        stream::iter(tokens)
            .map(|mut record| async move {
                record.is_active = false;
                let _: () = client
                    .fluent()
                    .update()
                    .in_col(collections::REFRESH_TOKENS)
                    .document_id(&record.token)
                    .object(&record)
                    .execute()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok::<_, AppError>(())
            })
            .buffer_unordered(MAX_CONCURRENT_DB_OPS)
            .collect::<Vec<Result<(), AppError>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<()>, AppError>>()?;

        tracing::info!(user_id, count, "Deactivated all active refresh tokens");
        Ok(count)
    }

    // ─── Quiz Set Operations ─────────────────────────────────────

    /// Get a quiz set without its cards.
    pub async fn get_quiz_set(&self, set_id: &str) -> Result<Option<QuizSet>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::QUIZ_SETS)
            .obj()
            .one(set_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Cards of a quiz set, in position order.
    pub async fn get_quiz_cards(&self, set_id: &str) -> Result<Vec<QuizCard>, AppError> {
        let sid = set_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::QUIZ_CARDS)
            .filter(move |q| q.field("quiz_set_id").eq(sid.clone()))
            .order_by([(
                "position",
                firestore::FirestoreQueryDirection::Ascending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All quiz sets, newest first.
    pub async fn list_quiz_sets(&self) -> Result<Vec<QuizSet>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::QUIZ_SETS)
            .order_by([(
                "created_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a quiz set together with its cards in one transaction.
    pub async fn create_quiz_set(
        &self,
        set: &QuizSet,
        cards: &[QuizCard],
    ) -> Result<(), AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::QUIZ_SETS)
            .document_id(&set.id)
            .object(set)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add quiz set: {}", e)))?;

        for card in cards {
            client
                .fluent()
                .update()
                .in_col(collections::QUIZ_CARDS)
                .document_id(&card.id)
                .object(card)
                .add_to_transaction(&mut transaction)
                .map_err(|e| AppError::Database(format!("Failed to add quiz card: {}", e)))?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(set_id = %set.id, cards = cards.len(), "Quiz set created");
        Ok(())
    }

    /// Replace a quiz set's fields and its entire card list atomically.
    ///
    /// The old cards are deleted and the new ones written in the same
    /// transaction as the parent update, so a failed commit leaves the
    /// previous card set intact.
    pub async fn replace_quiz_set(
        &self,
        set: &QuizSet,
        new_cards: &[QuizCard],
    ) -> Result<(), AppError> {
        let old_cards = self.get_quiz_cards(&set.id).await?;
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::QUIZ_SETS)
            .document_id(&set.id)
            .object(set)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to update quiz set: {}", e)))?;

        for card in &old_cards {
            client
                .fluent()
                .delete()
                .from(collections::QUIZ_CARDS)
                .document_id(&card.id)
                .add_to_transaction(&mut transaction)
                .map_err(|e| AppError::Database(format!("Failed to delete old card: {}", e)))?;
        }

        for card in new_cards {
            client
                .fluent()
                .update()
                .in_col(collections::QUIZ_CARDS)
                .document_id(&card.id)
                .object(card)
                .add_to_transaction(&mut transaction)
                .map_err(|e| AppError::Database(format!("Failed to add new card: {}", e)))?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            set_id = %set.id,
            removed = old_cards.len(),
            added = new_cards.len(),
            "Quiz set cards replaced"
        );
        Ok(())
    }

    /// Delete a quiz set and its cards. Returns false if the set was absent.
    pub async fn delete_quiz_set(&self, set_id: &str) -> Result<bool, AppError> {
        if self.get_quiz_set(set_id).await?.is_none() {
            return Ok(false);
        }

        let cards = self.get_quiz_cards(set_id).await?;
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        for card in &cards {
            client
                .fluent()
                .delete()
                .from(collections::QUIZ_CARDS)
                .document_id(&card.id)
                .add_to_transaction(&mut transaction)
                .map_err(|e| AppError::Database(format!("Failed to delete card: {}", e)))?;
        }

        client
            .fluent()
            .delete()
            .from(collections::QUIZ_SETS)
            .document_id(set_id)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to delete quiz set: {}", e)))?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(set_id, cards = cards.len(), "Quiz set deleted");
        Ok(true)
    }

    // ─── Progress + Stats (atomic pairs) ─────────────────────────

    /// All progress records for a user.
    pub async fn list_progress(&self, user_id: &str) -> Result<Vec<QuizProgress>, AppError> {
        let uid = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::QUIZ_PROGRESS)
            .filter(move |q| q.field("user_id").eq(uid.clone()))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Progress records a user currently has in progress.
    pub async fn list_in_progress(&self, user_id: &str) -> Result<Vec<QuizProgress>, AppError> {
        let uid = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::QUIZ_PROGRESS)
            .filter(move |q| {
                q.for_all([
                    q.field("user_id").eq(uid.clone()),
                    q.field("status").eq("in_progress"),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the stats aggregate for a user.
    pub async fn get_user_stats(&self, user_id: &str) -> Result<Option<UserStats>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_STATS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Store the stats aggregate for a user.
    pub async fn set_user_stats(
        &self,
        user_id: &str,
        stats: &UserStats,
    ) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USER_STATS)
            .document_id(user_id)
            .object(stats)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Atomically start (or re-start) a quiz set for a user.
    ///
    /// State machine per (user, set): absent -> creates the record and bumps
    /// the in-progress counter; in_progress -> no-op returning the existing
    /// record; completed -> retake, clearing the completion timestamp and
    /// moving the counters back.
    ///
    /// Runs as a read-write transaction: the progress and stats documents
    /// are read through the transaction-bound client, so a concurrent
    /// mutation of either aborts the commit and the closure retries on a
    /// fresh snapshot rather than losing a counter update.
    pub async fn start_quiz_progress(
        &self,
        user_id: &str,
        quiz_set_id: &str,
        quiz_set_name: &str,
    ) -> Result<QuizProgress, AppError> {
        let now = format_utc_rfc3339(chrono::Utc::now());
        let today = today_utc();
        let doc_id = QuizProgress::doc_id(user_id, quiz_set_id);
        let client = self.get_client()?;

        let progress = client
            .run_transaction(|db, transaction| {
                let user_id = user_id.to_string();
                let quiz_set_id = quiz_set_id.to_string();
                let quiz_set_name = quiz_set_name.to_string();
                let doc_id = doc_id.clone();
                let now = now.clone();
                async move {
                    let existing: Option<QuizProgress> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::QUIZ_PROGRESS)
                        .obj()
                        .one(&doc_id)
                        .await?;
                    let stats: Option<UserStats> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USER_STATS)
                        .obj()
                        .one(&user_id)
                        .await?;
                    let mut stats = stats.unwrap_or_default();

                    let progress = match existing {
                        Some(progress) if progress.status == ProgressStatus::InProgress => {
                            // Already studying this set; nothing to write.
                            return Ok(progress);
                        }
                        Some(mut progress) => {
                            // Retake of a completed set
                            progress.status = ProgressStatus::InProgress;
                            progress.completed_at = None;
                            progress.started_at = now.clone();
                            stats.note_retake(&now);
                            progress
                        }
                        None => {
                            stats.note_start(today, &now);
                            QuizProgress {
                                user_id: user_id.clone(),
                                quiz_set_id,
                                quiz_set_name,
                                status: ProgressStatus::InProgress,
                                started_at: now.clone(),
                                completed_at: None,
                            }
                        }
                    };

                    db.fluent()
                        .update()
                        .in_col(collections::QUIZ_PROGRESS)
                        .document_id(&doc_id)
                        .object(&progress)
                        .add_to_transaction(transaction)?;

                    db.fluent()
                        .update()
                        .in_col(collections::USER_STATS)
                        .document_id(&user_id)
                        .object(&stats)
                        .add_to_transaction(transaction)?;

                    Ok(progress)
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Start transaction failed: {}", e)))?;

        tracing::info!(user_id, quiz_set_id, "Quiz set started");
        Ok(progress)
    }

    /// Atomically mark a quiz set completed.
    ///
    /// Idempotent on repeat completion; `NotFound` when the user never
    /// started the set.
    pub async fn complete_quiz_progress(
        &self,
        user_id: &str,
        quiz_set_id: &str,
    ) -> Result<QuizProgress, AppError> {
        let now = format_utc_rfc3339(chrono::Utc::now());
        let today = today_utc();
        let doc_id = QuizProgress::doc_id(user_id, quiz_set_id);
        let client = self.get_client()?;

        let outcome: Result<QuizProgress, AppError> = client
            .run_transaction(|db, transaction| {
                let user_id = user_id.to_string();
                let quiz_set_id = quiz_set_id.to_string();
                let doc_id = doc_id.clone();
                let now = now.clone();
                async move {
                    let existing: Option<QuizProgress> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::QUIZ_PROGRESS)
                        .obj()
                        .one(&doc_id)
                        .await?;

                    let mut progress = match existing {
                        None => {
                            return Ok(Err(AppError::NotFound(format!(
                                "no progress for quiz set {}",
                                quiz_set_id
                            ))));
                        }
                        Some(progress) if progress.status == ProgressStatus::Completed => {
                            // Completing twice changes nothing.
                            return Ok(Ok(progress));
                        }
                        Some(progress) => progress,
                    };

                    progress.status = ProgressStatus::Completed;
                    progress.completed_at = Some(now.clone());

                    let stats: Option<UserStats> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USER_STATS)
                        .obj()
                        .one(&user_id)
                        .await?;
                    let mut stats = stats.unwrap_or_default();
                    stats.note_completion(today, &now);

                    db.fluent()
                        .update()
                        .in_col(collections::QUIZ_PROGRESS)
                        .document_id(&doc_id)
                        .object(&progress)
                        .add_to_transaction(transaction)?;

                    db.fluent()
                        .update()
                        .in_col(collections::USER_STATS)
                        .document_id(&user_id)
                        .object(&stats)
                        .add_to_transaction(transaction)?;

                    Ok(Ok(progress))
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Completion transaction failed: {}", e)))?;
        let progress = outcome?;

        tracing::info!(user_id, quiz_set_id, "Quiz set completed");
        Ok(progress)
    }

    /// Atomically delete a progress record, adjusting whichever counter its
    /// status was feeding. `NotFound` when the record is absent.
    pub async fn remove_quiz_progress(
        &self,
        user_id: &str,
        quiz_set_id: &str,
    ) -> Result<(), AppError> {
        let now = format_utc_rfc3339(chrono::Utc::now());
        let doc_id = QuizProgress::doc_id(user_id, quiz_set_id);
        let client = self.get_client()?;

        let outcome: Result<(), AppError> = client
            .run_transaction(|db, transaction| {
                let user_id = user_id.to_string();
                let quiz_set_id = quiz_set_id.to_string();
                let doc_id = doc_id.clone();
                let now = now.clone();
                async move {
                    let existing: Option<QuizProgress> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::QUIZ_PROGRESS)
                        .obj()
                        .one(&doc_id)
                        .await?;
                    let Some(progress) = existing else {
                        return Ok(Err(AppError::NotFound(format!(
                            "no progress for quiz set {}",
                            quiz_set_id
                        ))));
                    };

                    let stats: Option<UserStats> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USER_STATS)
                        .obj()
                        .one(&user_id)
                        .await?;
                    let mut stats = stats.unwrap_or_default();
                    stats.note_removal(progress.status, &now);

                    db.fluent()
                        .delete()
                        .from(collections::QUIZ_PROGRESS)
                        .document_id(&doc_id)
                        .add_to_transaction(transaction)?;

                    db.fluent()
                        .update()
                        .in_col(collections::USER_STATS)
                        .document_id(&user_id)
                        .object(&stats)
                        .add_to_transaction(transaction)?;

                    Ok(Ok(()))
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Removal transaction failed: {}", e)))?;
        outcome?;

        tracing::info!(user_id, quiz_set_id, "Quiz progress removed");
        Ok(())
    }

    /// Recompute the cached counters from the actual progress rows.
    pub async fn resync_user_stats(&self, user_id: &str) -> Result<UserStats, AppError> {
        let now = format_utc_rfc3339(chrono::Utc::now());
        let records = self.list_progress(user_id).await?;

        let in_progress = records
            .iter()
            .filter(|r| r.status == ProgressStatus::InProgress)
            .count() as u32;
        let completed = records
            .iter()
            .filter(|r| r.status == ProgressStatus::Completed)
            .count() as u32;

        let mut stats = self.get_user_stats(user_id).await?.unwrap_or_default();
        stats.resync(in_progress, completed, &now);
        self.set_user_stats(user_id, &stats).await?;

        tracing::info!(user_id, in_progress, completed, "User stats resynced");
        Ok(stats)
    }
}
