// SPDX-License-Identifier: MIT

//! Per-user, per-quiz-set study progress.

use serde::{Deserialize, Serialize};

/// Study state for one (user, quiz set) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    InProgress,
    Completed,
}

/// Progress record.
///
/// At most one record exists per (user, quiz set); the document ID is
/// `{user_id}_{quiz_set_id}` so re-starting updates in place instead of
/// duplicating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizProgress {
    pub user_id: String,
    pub quiz_set_id: String,
    /// Set title captured when the user first started (denormalized)
    pub quiz_set_name: String,
    pub status: ProgressStatus,
    /// When the user first (or most recently re-) started (RFC 3339)
    pub started_at: String,
    /// Set on completion, cleared on retake
    pub completed_at: Option<String>,
}

impl QuizProgress {
    /// Document ID for a (user, quiz set) pair.
    pub fn doc_id(user_id: &str, quiz_set_id: &str) -> String {
        format!("{}_{}", user_id, quiz_set_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_id_is_stable_per_pair() {
        assert_eq!(QuizProgress::doc_id("u1", "q1"), "u1_q1");
        assert_ne!(
            QuizProgress::doc_id("u1", "q2"),
            QuizProgress::doc_id("u2", "q1")
        );
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ProgressStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(
            serde_json::to_string(&ProgressStatus::Completed).unwrap(),
            "\"completed\""
        );
    }
}
