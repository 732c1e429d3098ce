// SPDX-License-Identifier: MIT

//! Quiz set routes. Reads are public; mutations and the start-studying
//! endpoint require a session, and mutations are owner-only.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::AuthUser;
use crate::models::{QuizCard, QuizSet, QuizSetWithCards};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/quiz/sets", get(list_sets))
        .route("/quiz/sets/{id}", get(get_set))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/quiz/sets", post(create_set))
        .route(
            "/quiz/sets/{id}",
            axum::routing::put(update_set).delete(delete_set),
        )
        .route("/quiz/sets/{id}/start", post(start_set))
}

#[derive(Deserialize, serde::Serialize, Validate)]
pub struct CardInput {
    #[validate(length(min = 1))]
    pub question: String,
    #[validate(length(min = 2))]
    pub answers: Vec<String>,
    pub correct_answer: u32,
}

#[derive(Deserialize, Validate)]
pub struct QuizSetInput {
    #[validate(length(min = 1))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[validate(nested, length(min = 1))]
    pub cards: Vec<CardInput>,
}

impl QuizSetInput {
    fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        for card in &self.cards {
            if card.correct_answer as usize >= card.answers.len() {
                return Err(AppError::BadRequest(format!(
                    "correct_answer {} out of range for {} answers",
                    card.correct_answer,
                    card.answers.len()
                )));
            }
        }
        Ok(())
    }

    /// Materialize the cards with fresh IDs under the given parent set.
    fn build_cards(&self, quiz_set_id: &str) -> Vec<QuizCard> {
        self.cards
            .iter()
            .enumerate()
            .map(|(position, card)| QuizCard {
                id: uuid::Uuid::new_v4().to_string(),
                quiz_set_id: quiz_set_id.to_string(),
                question: card.question.clone(),
                answers: card.answers.clone(),
                correct_answer: card.correct_answer,
                position: position as u32,
            })
            .collect()
    }
}

/// All quiz sets, newest first. Cards are not included.
async fn list_sets(State(state): State<Arc<AppState>>) -> Result<Json<Vec<QuizSet>>> {
    let sets = state.db.list_quiz_sets().await?;
    Ok(Json(sets))
}

/// One quiz set with its cards in position order.
async fn get_set(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<QuizSetWithCards>> {
    let set = state
        .db
        .get_quiz_set(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Quiz set {} not found", id)))?;
    let cards = state.db.get_quiz_cards(&id).await?;
    Ok(Json(QuizSetWithCards { set, cards }))
}

/// Create a quiz set owned by the caller.
async fn create_set(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<QuizSetInput>,
) -> Result<(StatusCode, Json<QuizSetWithCards>)> {
    body.check()?;

    let author = state.accounts.get_user(&user.user_id).await?.username;
    let now = format_utc_rfc3339(chrono::Utc::now());
    let set = QuizSet {
        id: uuid::Uuid::new_v4().to_string(),
        title: body.title.clone(),
        description: body.description.clone(),
        author,
        user_id: user.user_id.clone(),
        card_count: body.cards.len() as u32,
        created_at: now.clone(),
        updated_at: now,
    };
    let cards = body.build_cards(&set.id);

    state.db.create_quiz_set(&set, &cards).await?;
    tracing::info!(user_id = %user.user_id, quiz_set_id = %set.id, "Quiz set created");

    Ok((StatusCode::CREATED, Json(QuizSetWithCards { set, cards })))
}

/// Replace a quiz set's content and cards. Owner only; a foreign set is
/// reported as not found rather than forbidden.
async fn update_set(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<QuizSetInput>,
) -> Result<Json<QuizSetWithCards>> {
    body.check()?;

    let existing = state
        .db
        .get_quiz_set(&id)
        .await?
        .filter(|s| s.user_id == user.user_id)
        .ok_or_else(|| AppError::NotFound(format!("Quiz set {} not found", id)))?;

    let set = QuizSet {
        title: body.title.clone(),
        description: body.description.clone(),
        card_count: body.cards.len() as u32,
        updated_at: format_utc_rfc3339(chrono::Utc::now()),
        ..existing
    };
    let cards = body.build_cards(&set.id);

    state.db.replace_quiz_set(&set, &cards).await?;
    tracing::info!(user_id = %user.user_id, quiz_set_id = %set.id, "Quiz set replaced");

    Ok(Json(QuizSetWithCards { set, cards }))
}

/// Delete a quiz set and its cards. Owner only.
async fn delete_set(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let _existing = state
        .db
        .get_quiz_set(&id)
        .await?
        .filter(|s| s.user_id == user.user_id)
        .ok_or_else(|| AppError::NotFound(format!("Quiz set {} not found", id)))?;

    state.db.delete_quiz_set(&id).await?;
    tracing::info!(user_id = %user.user_id, quiz_set_id = %id, "Quiz set deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Open a set for study: returns the full set and records a progress
/// start (or retake) for the caller.
async fn start_set(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<QuizSetWithCards>> {
    let set = state
        .db
        .get_quiz_set(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Quiz set {} not found", id)))?;
    let cards = state.db.get_quiz_cards(&id).await?;

    state.progress.start(&user.user_id, &id, &set.title).await?;

    Ok(Json(QuizSetWithCards { set, cards }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(cards: Vec<CardInput>) -> QuizSetInput {
        QuizSetInput {
            title: "Capitals".to_string(),
            description: String::new(),
            cards,
        }
    }

    #[test]
    fn test_correct_answer_must_index_answers() {
        let bad = input(vec![CardInput {
            question: "Capital of France?".to_string(),
            answers: vec!["Paris".to_string(), "Lyon".to_string()],
            correct_answer: 2,
        }]);
        assert!(matches!(bad.check(), Err(AppError::BadRequest(_))));

        let ok = input(vec![CardInput {
            question: "Capital of France?".to_string(),
            answers: vec!["Paris".to_string(), "Lyon".to_string()],
            correct_answer: 0,
        }]);
        assert!(ok.check().is_ok());
    }

    #[test]
    fn test_empty_card_list_rejected() {
        assert!(input(vec![]).check().is_err());
    }

    #[test]
    fn test_cards_get_sequential_positions() {
        let body = input(
            (0..3)
                .map(|i| CardInput {
                    question: format!("Q{}", i),
                    answers: vec!["a".to_string(), "b".to_string()],
                    correct_answer: 0,
                })
                .collect(),
        );
        let cards = body.build_cards("set-1");
        let positions: Vec<u32> = cards.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
        assert!(cards.iter().all(|c| c.quiz_set_id == "set-1"));
    }
}
