// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod progress;
pub mod quiz;
pub mod stats;
pub mod token;
pub mod user;

pub use progress::{ProgressStatus, QuizProgress};
pub use quiz::{QuizCard, QuizSet, QuizSetWithCards};
pub use stats::UserStats;
pub use token::RefreshToken;
pub use user::{User, UserProfile};
