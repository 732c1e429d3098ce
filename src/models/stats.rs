// SPDX-License-Identifier: MIT

//! User statistics aggregates for efficient dashboard queries.
//!
//! The counters here are cached aggregates derived from the progress
//! records. They are updated in the same transaction as the progress write
//! (see `db::firestore`), and can be rebuilt from source records via
//! `resync` if they ever drift.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::progress::ProgressStatus;

/// Pre-computed statistics for a user, one document per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    /// Consecutive calendar days with at least one study event
    #[serde(default)]
    pub streak_days: u32,
    /// Number of quiz sets currently completed
    #[serde(default)]
    pub completed_quiz_sets: u32,
    /// Number of quiz sets currently in progress
    #[serde(default)]
    pub in_progress_quiz_sets: u32,
    /// Most recent study date, day granularity
    #[serde(default)]
    pub last_study_date: Option<NaiveDate>,
    /// Last update timestamp (RFC 3339)
    #[serde(default)]
    pub updated_at: String,
}

impl Default for UserStats {
    fn default() -> Self {
        Self {
            streak_days: 0,
            completed_quiz_sets: 0,
            in_progress_quiz_sets: 0,
            last_study_date: None,
            updated_at: String::new(),
        }
    }
}

impl UserStats {
    /// A fresh start of a quiz set: one more set in progress, and today
    /// counts as a study day.
    pub fn note_start(&mut self, today: NaiveDate, now: &str) {
        self.in_progress_quiz_sets += 1;
        self.update_streak(today, now);
    }

    /// A completed set being re-opened for another run. Reverses the
    /// completion this set previously contributed.
    pub fn note_retake(&mut self, now: &str) {
        self.completed_quiz_sets = self.completed_quiz_sets.saturating_sub(1);
        self.in_progress_quiz_sets += 1;
        self.updated_at = now.to_string();
    }

    /// A set moving from in-progress to completed.
    pub fn note_completion(&mut self, today: NaiveDate, now: &str) {
        self.in_progress_quiz_sets = self.in_progress_quiz_sets.saturating_sub(1);
        self.completed_quiz_sets += 1;
        self.update_streak(today, now);
    }

    /// A progress record being deleted outright; decrement whichever
    /// counter its status was feeding.
    pub fn note_removal(&mut self, status: ProgressStatus, now: &str) {
        match status {
            ProgressStatus::InProgress => {
                self.in_progress_quiz_sets = self.in_progress_quiz_sets.saturating_sub(1);
            }
            ProgressStatus::Completed => {
                self.completed_quiz_sets = self.completed_quiz_sets.saturating_sub(1);
            }
        }
        self.updated_at = now.to_string();
    }

    /// Advance the study streak for `today`.
    ///
    /// - no prior study date: streak becomes 1
    /// - same day: unchanged (repeat study does not double-count)
    /// - exactly one day later: streak + 1
    /// - any larger gap: streak restarts at 1
    ///
    /// Nothing here ever sets the streak to 0; only `reset` does.
    pub fn update_streak(&mut self, today: NaiveDate, now: &str) {
        match self.last_study_date {
            None => {
                self.streak_days = 1;
                self.last_study_date = Some(today);
            }
            Some(last) => match (today - last).num_days() {
                0 => {}
                1 => {
                    self.streak_days += 1;
                    self.last_study_date = Some(today);
                }
                _ => {
                    self.streak_days = 1;
                    self.last_study_date = Some(today);
                }
            },
        }
        self.updated_at = now.to_string();
    }

    /// Explicit reset: the only operation that zeroes the streak.
    /// The in-progress counter is left alone; `resync` repairs counts.
    pub fn reset(&mut self, now: &str) {
        self.streak_days = 0;
        self.completed_quiz_sets = 0;
        self.last_study_date = None;
        self.updated_at = now.to_string();
    }

    /// Overwrite the cached counters with counts taken from the actual
    /// progress records.
    pub fn resync(&mut self, in_progress: u32, completed: u32, now: &str) {
        self.in_progress_quiz_sets = in_progress;
        self.completed_quiz_sets = completed;
        self.updated_at = now.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_first_study_starts_streak_at_one() {
        let mut stats = UserStats::default();
        stats.update_streak(day("2025-03-18"), "now");

        assert_eq!(stats.streak_days, 1);
        assert_eq!(stats.last_study_date, Some(day("2025-03-18")));
    }

    #[test]
    fn test_same_day_repeat_does_not_double_count() {
        let mut stats = UserStats::default();
        stats.update_streak(day("2025-03-18"), "now");
        stats.update_streak(day("2025-03-18"), "now");

        assert_eq!(stats.streak_days, 1);
    }

    #[test]
    fn test_consecutive_day_extends_streak() {
        let mut stats = UserStats::default();
        stats.update_streak(day("2025-03-18"), "now");
        stats.update_streak(day("2025-03-19"), "now");

        assert_eq!(stats.streak_days, 2);
        assert_eq!(stats.last_study_date, Some(day("2025-03-19")));
    }

    #[test]
    fn test_gap_resets_streak_to_one() {
        let mut stats = UserStats::default();
        stats.update_streak(day("2025-03-18"), "now");
        stats.update_streak(day("2025-03-19"), "now");
        // Skip two days
        stats.update_streak(day("2025-03-22"), "now");

        assert_eq!(stats.streak_days, 1);
        assert_eq!(stats.last_study_date, Some(day("2025-03-22")));
    }

    #[test]
    fn test_completion_moves_counter_and_streak() {
        let mut stats = UserStats::default();
        stats.note_start(day("2025-03-18"), "now");
        assert_eq!(stats.in_progress_quiz_sets, 1);
        assert_eq!(stats.streak_days, 1);

        stats.note_completion(day("2025-03-18"), "now");
        assert_eq!(stats.in_progress_quiz_sets, 0);
        assert_eq!(stats.completed_quiz_sets, 1);
        assert_eq!(stats.streak_days, 1); // same day, no double count
    }

    #[test]
    fn test_retake_reverses_completion_counter() {
        let mut stats = UserStats::default();
        stats.note_start(day("2025-03-18"), "now");
        stats.note_completion(day("2025-03-18"), "now");

        stats.note_retake("now");
        assert_eq!(stats.completed_quiz_sets, 0);
        assert_eq!(stats.in_progress_quiz_sets, 1);
    }

    #[test]
    fn test_counters_clamp_at_zero() {
        let mut stats = UserStats::default();
        stats.note_removal(ProgressStatus::InProgress, "now");
        stats.note_removal(ProgressStatus::Completed, "now");
        stats.note_retake("now");

        assert_eq!(stats.in_progress_quiz_sets, 1); // retake still increments
        assert_eq!(stats.completed_quiz_sets, 0);
    }

    #[test]
    fn test_reset_zeroes_streak_and_completions() {
        let mut stats = UserStats::default();
        stats.note_start(day("2025-03-18"), "now");
        stats.note_completion(day("2025-03-18"), "now");
        stats.note_start(day("2025-03-19"), "now");

        stats.reset("now");
        assert_eq!(stats.streak_days, 0);
        assert_eq!(stats.completed_quiz_sets, 0);
        assert_eq!(stats.last_study_date, None);
        // in-progress left for resync to repair
        assert_eq!(stats.in_progress_quiz_sets, 1);
    }

    #[test]
    fn test_resync_overwrites_drifted_counters() {
        let mut stats = UserStats {
            in_progress_quiz_sets: 42,
            completed_quiz_sets: 99,
            ..Default::default()
        };

        stats.resync(2, 3, "now");
        assert_eq!(stats.in_progress_quiz_sets, 2);
        assert_eq!(stats.completed_quiz_sets, 3);
    }
}
