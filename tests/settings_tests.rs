// SPDX-License-Identifier: MIT

//! Profile and calendar-preference tests.

use axum::http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

mod common;

#[tokio::test]
async fn test_me_returns_profile_without_credentials() {
    let (app, state) = common::create_test_app(common::TestEndpoints::default()).await;
    let (user_id, _) = common::seed_user(&state.db, "g1", "Anna", Some("refresh-1")).await;
    let token = common::session_token(&state, user_id);

    let response = app
        .oneshot(common::get_request("GET", "/api/me", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = common::body_json(response).await;

    assert_eq!(body["id"].as_i64(), Some(user_id));
    assert_eq!(body["name"], "Anna");
    assert_eq!(body["sync_enabled"], false);
    assert!(body.get("refresh_token").is_none());
}

#[tokio::test]
async fn test_settings_partial_update() {
    let (app, state) = common::create_test_app(common::TestEndpoints::default()).await;
    let (user_id, _) = common::seed_user(&state.db, "g1", "Anna", None).await;
    let token = common::session_token(&state, user_id);

    let response = app
        .clone()
        .oneshot(common::json_request(
            "PUT",
            "/api/settings",
            &token,
            &json!({ "calendar_id": "family@group.calendar.google.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Updating one field leaves the other untouched
    let response = app
        .clone()
        .oneshot(common::json_request(
            "PUT",
            "/api/settings",
            &token,
            &json!({ "sync_enabled": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let user = state.db.get_user(user_id).await.unwrap().unwrap();
    assert_eq!(
        user.calendar_id.as_deref(),
        Some("family@group.calendar.google.com")
    );
    assert!(user.sync_enabled);
}

#[tokio::test]
async fn test_stored_calendar_is_used_for_new_events() {
    let (base, stub) = common::spawn_calendar_stub().await;
    let (app, state) = common::create_test_app(common::endpoints_with_calendar(&base)).await;
    let (user_id, _) = common::seed_user(&state.db, "g1", "Anna", Some("refresh-1")).await;
    let token = common::session_token(&state, user_id);

    state
        .db
        .update_settings(user_id, Some("stored@calendar"), Some(true))
        .await
        .unwrap();

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/records",
            &token,
            &json!({ "title": "Očkování", "start_date": "2024-03-05", "addToCalendar": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        stub.last_calendar.lock().unwrap().as_deref(),
        Some("stored@calendar")
    );
}
