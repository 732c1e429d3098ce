// SPDX-License-Identifier: MIT

//! Per-user study statistics and quiz progress routes. Every endpoint is
//! scoped by the user ID in the path, which must match the session owner.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{QuizProgress, UserStats};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/stats/{user_id}", get(get_stats))
        .route("/stats/{user_id}/progress", get(all_progress))
        .route("/stats/{user_id}/in-progress", get(in_progress))
        .route(
            "/stats/{user_id}/quiz-sets/{set_id}/complete",
            post(complete_quiz_set),
        )
        .route(
            "/stats/{user_id}/quiz-sets/{set_id}",
            delete(remove_quiz_set),
        )
        .route("/stats/{user_id}/resync", post(resync))
        .route("/stats/{user_id}/reset", post(reset))
}

/// Stats endpoints never cross user boundaries.
fn check_owner(path_user_id: &str, auth: &AuthUser) -> Result<()> {
    if path_user_id != auth.user_id {
        return Err(AppError::Forbidden(
            "Cannot access another user's statistics".to_string(),
        ));
    }
    Ok(())
}

/// Current stats aggregate. A user with no activity gets zeroed defaults.
async fn get_stats(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<UserStats>> {
    check_owner(&user_id, &auth)?;
    let stats = state.progress.stats(&user_id).await?;
    Ok(Json(stats))
}

/// Every progress record for the user, any status.
async fn all_progress(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<QuizProgress>>> {
    check_owner(&user_id, &auth)?;
    let records = state.progress.all_progress(&user_id).await?;
    Ok(Json(records))
}

/// Only the records still being studied.
async fn in_progress(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<QuizProgress>>> {
    check_owner(&user_id, &auth)?;
    let records = state.progress.in_progress(&user_id).await?;
    Ok(Json(records))
}

/// Mark a quiz set completed. Idempotent for already-completed sets;
/// 404 when the set was never started.
async fn complete_quiz_set(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((user_id, set_id)): Path<(String, String)>,
) -> Result<Json<QuizProgress>> {
    check_owner(&user_id, &auth)?;
    let record = state.progress.complete(&user_id, &set_id).await?;
    tracing::info!(user_id = %user_id, quiz_set_id = %set_id, "Quiz set completed");
    Ok(Json(record))
}

/// Drop a progress record, decrementing the matching counter.
async fn remove_quiz_set(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((user_id, set_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    check_owner(&user_id, &auth)?;
    state.progress.remove(&user_id, &set_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Recount the in-progress/completed counters from the progress records.
/// Streak fields are left alone.
async fn resync(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<UserStats>> {
    check_owner(&user_id, &auth)?;
    let stats = state.progress.resync(&user_id).await?;
    tracing::info!(user_id = %user_id, "Stats resynced from progress records");
    Ok(Json(stats))
}

/// Zero the streak and completion counters. The only operation that
/// resets a streak to zero rather than one.
async fn reset(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> Result<Json<UserStats>> {
    check_owner(&user_id, &auth)?;
    let stats = state.progress.reset(&user_id).await?;
    tracing::info!(user_id = %user_id, "Stats reset");
    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_owner() {
        let auth = AuthUser {
            user_id: "user-1".to_string(),
        };
        assert!(check_owner("user-1", &auth).is_ok());
        assert!(matches!(
            check_owner("user-2", &auth),
            Err(AppError::Forbidden(_))
        ));
    }
}
