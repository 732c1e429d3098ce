// SPDX-License-Identifier: MIT

//! QuizDeck API Server
//!
//! Serves quiz sets and per-user study statistics, with local and
//! Google/Kakao OAuth login backed by Firestore.

use quizdeck::{
    config::Config,
    db::FirestoreDb,
    services::{AccountService, OAuthService, ProgressService, SessionService},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting QuizDeck API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

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

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        sessions,
        oauth,
        accounts,
        progress,
    });

    // Build router
    let app = quizdeck::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("quizdeck=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
