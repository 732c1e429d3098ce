// SPDX-License-Identifier: MIT

//! QuizDeck: a quiz-studying backend.
//!
//! This crate provides the API for user accounts (local passwords plus
//! Google/Kakao OAuth), cookie-based JWT sessions, quiz set management,
//! and per-user study progress with streak tracking.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{AccountService, OAuthService, ProgressService, SessionService};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub sessions: SessionService,
    pub oauth: OAuthService,
    pub accounts: AccountService,
    pub progress: ProgressService,
}
