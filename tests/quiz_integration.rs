// SPDX-License-Identifier: MIT

//! Quiz set CRUD tests over HTTP against the Firestore emulator.
//! Skipped when FIRESTORE_EMULATOR_HOST is not set.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use tower::ServiceExt;

async fn register_user(app: &axum::Router, username: &str) -> String {
    let email = format!("{}-{}@example.com", username, uuid::Uuid::new_v4());
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::json!({
                        "email": email,
                        "password": "correct horse battery",
                        "username": username,
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|c| c.starts_with("access_token="))
        .and_then(|c| c.split(';').next())
        .map(|pair| pair["access_token=".len()..].to_string())
        .expect("access cookie set")
}

async fn send_json(
    app: &axum::Router,
    method: Method,
    uri: &str,
    access: &str,
    body: Option<serde_json::Value>,
) -> axum::response::Response {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, format!("access_token={}", access));
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 256 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn sample_set(title: &str) -> serde_json::Value {
    serde_json::json!({
        "title": title,
        "description": "Basic geography",
        "cards": [
            {"question": "Capital of France?", "answers": ["Paris", "Lyon"], "correct_answer": 0},
            {"question": "Capital of Japan?", "answers": ["Osaka", "Tokyo"], "correct_answer": 1},
        ],
    })
}

#[tokio::test]
async fn test_quiz_set_crud() {
    require_emulator!();
    let (app, _state) = common::create_emulator_app().await;
    let access = register_user(&app, "author").await;

    // Create
    let response = send_json(
        &app,
        Method::POST,
        "/quiz/sets",
        &access,
        Some(sample_set("Capitals")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let set_id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["card_count"], 2);
    assert_eq!(created["author"], "author");
    assert_eq!(created["cards"].as_array().unwrap().len(), 2);

    // Read is public
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/quiz/sets/{}", set_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["title"], "Capitals");
    assert_eq!(fetched["cards"][0]["position"], 0);
    assert_eq!(fetched["cards"][1]["position"], 1);

    // Replace with a single card
    let update = serde_json::json!({
        "title": "Capitals v2",
        "description": "",
        "cards": [
            {"question": "Capital of Italy?", "answers": ["Rome", "Milan"], "correct_answer": 0},
        ],
    });
    let response = send_json(
        &app,
        Method::PUT,
        &format!("/quiz/sets/{}", set_id),
        &access,
        Some(update),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["card_count"], 1);
    assert_eq!(updated["title"], "Capitals v2");

    // Delete
    let response = send_json(
        &app,
        Method::DELETE,
        &format!("/quiz/sets/{}", set_id),
        &access,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/quiz/sets/{}", set_id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_quiz_set_mutations_are_owner_only() {
    require_emulator!();
    let (app, _state) = common::create_emulator_app().await;
    let owner = register_user(&app, "owner").await;
    let intruder = register_user(&app, "intruder").await;

    let response = send_json(
        &app,
        Method::POST,
        "/quiz/sets",
        &owner,
        Some(sample_set("Private")),
    )
    .await;
    let set_id = body_json(response).await["id"].as_str().unwrap().to_string();

    // A foreign set reads as not found, not forbidden
    let response = send_json(
        &app,
        Method::PUT,
        &format!("/quiz/sets/{}", set_id),
        &intruder,
        Some(sample_set("Hijacked")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send_json(
        &app,
        Method::DELETE,
        &format!("/quiz/sets/{}", set_id),
        &intruder,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_start_records_progress() {
    require_emulator!();
    let (app, state) = common::create_emulator_app().await;
    let access = register_user(&app, "student").await;

    let response = send_json(
        &app,
        Method::POST,
        "/quiz/sets",
        &access,
        Some(sample_set("Rivers")),
    )
    .await;
    let set_id = body_json(response).await["id"].as_str().unwrap().to_string();

    let response = send_json(
        &app,
        Method::POST,
        &format!("/quiz/sets/{}/start", set_id),
        &access,
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let opened = body_json(response).await;
    assert_eq!(opened["cards"].as_array().unwrap().len(), 2);

    // The start was recorded against the caller
    let user_id = state
        .sessions
        .validate_access_token(&access)
        .expect("token valid");
    let open = state.progress.in_progress(&user_id).await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].quiz_set_name, "Rivers");
}

#[tokio::test]
async fn test_invalid_quiz_payload_rejected() {
    require_emulator!();
    let (app, _state) = common::create_emulator_app().await;
    let access = register_user(&app, "validator").await;

    // correct_answer out of range
    let bad = serde_json::json!({
        "title": "Broken",
        "cards": [
            {"question": "Q?", "answers": ["a", "b"], "correct_answer": 5},
        ],
    });
    let response = send_json(&app, Method::POST, "/quiz/sets", &access, Some(bad)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // No cards at all
    let empty = serde_json::json!({"title": "Empty", "cards": []});
    let response = send_json(&app, Method::POST, "/quiz/sets", &access, Some(empty)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
