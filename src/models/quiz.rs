// SPDX-License-Identifier: MIT

//! Quiz set and card models.

use serde::{Deserialize, Serialize};

/// A quiz set (parent of its cards).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSet {
    /// UUID, also used as the document ID
    pub id: String,
    pub title: String,
    pub description: String,
    /// Display name of the author
    pub author: String,
    /// Owning user ID
    pub user_id: String,
    /// Denormalized count of child cards
    pub card_count: u32,
    pub created_at: String,
    pub updated_at: String,
}

/// One question card inside a quiz set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizCard {
    /// UUID, also used as the document ID
    pub id: String,
    /// Parent quiz set ID
    pub quiz_set_id: String,
    pub question: String,
    /// Answer choices in display order
    pub answers: Vec<String>,
    /// Index into `answers` (0-based)
    pub correct_answer: u32,
    /// Position within the set, preserved across card replacement
    pub position: u32,
}

/// Quiz set with its cards, returned when a set is opened for study.
#[derive(Debug, Clone, Serialize)]
pub struct QuizSetWithCards {
    #[serde(flatten)]
    pub set: QuizSet,
    pub cards: Vec<QuizCard>,
}
