// SPDX-License-Identifier: MIT

use quizdeck::config::Config;
use quizdeck::db::FirestoreDb;
use quizdeck::routes::create_router;
use quizdeck::services::{AccountService, OAuthService, ProgressService, SessionService};
use quizdeck::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Build shared state on top of the given database.
#[allow(dead_code)]
pub fn test_state(db: FirestoreDb) -> Arc<AppState> {
    let config = Config::test_default();

    let sessions = SessionService::new(
        config.jwt_secret.clone(),
        config.access_token_ttl_minutes,
        config.refresh_token_ttl_days,
        db.clone(),
    );
    let oauth = OAuthService::new(
        config.api_url.clone(),
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
        config.kakao_client_id.clone(),
        config.kakao_client_secret.clone(),
        db.clone(),
    );
    let accounts = AccountService::new(db.clone());
    let progress = ProgressService::new(db.clone());

    Arc::new(AppState {
        config,
        db,
        sessions,
        oauth,
        accounts,
        progress,
    })
}

/// Create a test app with an offline mock database.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = test_state(test_db_offline());
    (create_router(state.clone()), state)
}

/// Create a test app backed by the Firestore emulator.
#[allow(dead_code)]
pub async fn create_emulator_app() -> (axum::Router, Arc<AppState>) {
    let state = test_state(test_db().await);
    (create_router(state.clone()), state)
}
