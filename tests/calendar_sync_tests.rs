// SPDX-License-Identifier: MIT

//! Calendar mirroring behavior across record mutations.
//!
//! Record writes must succeed whether the external calendar works,
//! fails, or was never connected.

use axum::http::StatusCode;
use serde_json::json;
use std::sync::atomic::Ordering;
use tower::ServiceExt;
use zdravi_tracker::db::RecordFields;

mod common;

#[tokio::test]
async fn test_create_with_calendar_stores_event_id() {
    let (base, stub) = common::spawn_calendar_stub().await;
    let (app, state) = common::create_test_app(common::endpoints_with_calendar(&base)).await;
    let (user_id, family_id) = common::seed_user(&state.db, "g1", "Anna", Some("refresh-1")).await;
    let token = common::session_token(&state, user_id);

    let member_id = state
        .db
        .create_member(family_id, user_id, "Eva", "#dc2626")
        .await
        .unwrap();

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/records",
            &token,
            &json!({
                "title": "Neštovice",
                "description": "Klid doma",
                "start_date": "2024-03-05",
                "end_date": "2024-03-07",
                "member_id": member_id,
                "addToCalendar": true,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = common::body_json(response).await;
    assert_eq!(created["google_event_id"], "evt-test-1");

    assert_eq!(stub.inserts.load(Ordering::SeqCst), 1);
    let event = stub.last_event.lock().unwrap().clone().unwrap();
    assert_eq!(event["summary"], "Zdraví: Eva - Neštovice");
    assert_eq!(event["start"]["date"], "2024-03-05");
    // All-day events use an exclusive end date
    assert_eq!(event["end"]["date"], "2024-03-08");

    let record = state
        .db
        .get_record(created["id"].as_i64().unwrap(), family_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.google_event_id.as_deref(), Some("evt-test-1"));
}

#[tokio::test]
async fn test_requested_calendar_overrides_stored_default() {
    let (base, stub) = common::spawn_calendar_stub().await;
    let (app, state) = common::create_test_app(common::endpoints_with_calendar(&base)).await;
    let (user_id, _) = common::seed_user(&state.db, "g1", "Anna", Some("refresh-1")).await;
    let token = common::session_token(&state, user_id);

    state
        .db
        .update_settings(user_id, Some("stored@calendar"), None)
        .await
        .unwrap();

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/records",
            &token,
            &json!({
                "title": "Očkování",
                "start_date": "2024-03-05",
                "addToCalendar": true,
                "calendarId": "requested@calendar",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        stub.last_calendar.lock().unwrap().as_deref(),
        Some("requested@calendar")
    );
}

#[tokio::test]
async fn test_create_without_refresh_token_skips_calendar() {
    let (base, stub) = common::spawn_calendar_stub().await;
    let (app, state) = common::create_test_app(common::endpoints_with_calendar(&base)).await;
    let (user_id, _) = common::seed_user(&state.db, "g1", "Anna", None).await;
    let token = common::session_token(&state, user_id);

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/records",
            &token,
            &json!({ "title": "Rýma", "start_date": "2024-03-05", "addToCalendar": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = common::body_json(response).await;
    assert!(created["google_event_id"].is_null());
    assert_eq!(stub.inserts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_create_succeeds_when_calendar_is_down() {
    // Calendar endpoints refuse connections
    let (app, state) = common::create_test_app(common::TestEndpoints::default()).await;
    let (user_id, _) = common::seed_user(&state.db, "g1", "Anna", Some("refresh-1")).await;
    let token = common::session_token(&state, user_id);

    let response = app
        .oneshot(common::json_request(
            "POST",
            "/api/records",
            &token,
            &json!({ "title": "Rýma", "start_date": "2024-03-05", "addToCalendar": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = common::body_json(response).await;
    assert!(created["google_event_id"].is_null());
}

#[tokio::test]
async fn test_update_with_existing_event_updates_in_place() {
    let (base, stub) = common::spawn_calendar_stub().await;
    let (app, state) = common::create_test_app(common::endpoints_with_calendar(&base)).await;
    let (user_id, family_id) = common::seed_user(&state.db, "g1", "Anna", Some("refresh-1")).await;
    let token = common::session_token(&state, user_id);

    let record_id = state
        .db
        .create_record(
            user_id,
            family_id,
            &RecordFields {
                member_id: None,
                title: "Rýma",
                description: None,
                start_date: "2024-03-05",
                end_date: None,
                google_event_id: Some("evt-old"),
            },
        )
        .await
        .unwrap();

    let response = app
        .oneshot(common::json_request(
            "PUT",
            &format!("/api/records/{record_id}"),
            &token,
            &json!({ "title": "Rýma a kašel", "start_date": "2024-03-05", "addToCalendar": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(stub.updates.load(Ordering::SeqCst), 1);
    assert_eq!(stub.inserts.load(Ordering::SeqCst), 0);

    let record = state.db.get_record(record_id, family_id).await.unwrap().unwrap();
    assert_eq!(record.google_event_id.as_deref(), Some("evt-old"));
    let event = stub.last_event.lock().unwrap().clone().unwrap();
    assert_eq!(event["summary"], "Zdraví: Rýma a kašel");
}

#[tokio::test]
async fn test_unchecking_calendar_clears_event_id_even_if_delete_fails() {
    // Delete will fail: calendar endpoints are dead
    let (app, state) = common::create_test_app(common::TestEndpoints::default()).await;
    let (user_id, family_id) = common::seed_user(&state.db, "g1", "Anna", Some("refresh-1")).await;
    let token = common::session_token(&state, user_id);

    let record_id = state
        .db
        .create_record(
            user_id,
            family_id,
            &RecordFields {
                member_id: None,
                title: "Rýma",
                description: None,
                start_date: "2024-03-05",
                end_date: None,
                google_event_id: Some("evt-stale"),
            },
        )
        .await
        .unwrap();

    let response = app
        .oneshot(common::json_request(
            "PUT",
            &format!("/api/records/{record_id}"),
            &token,
            &json!({ "title": "Rýma", "start_date": "2024-03-05", "addToCalendar": false }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let record = state.db.get_record(record_id, family_id).await.unwrap().unwrap();
    assert!(
        record.google_event_id.is_none(),
        "Event id must be cleared even when the external delete fails"
    );
}

#[tokio::test]
async fn test_delete_record_deletes_mirrored_event() {
    let (base, stub) = common::spawn_calendar_stub().await;
    let (app, state) = common::create_test_app(common::endpoints_with_calendar(&base)).await;
    let (user_id, family_id) = common::seed_user(&state.db, "g1", "Anna", Some("refresh-1")).await;
    let token = common::session_token(&state, user_id);

    let record_id = state
        .db
        .create_record(
            user_id,
            family_id,
            &RecordFields {
                member_id: None,
                title: "Rýma",
                description: None,
                start_date: "2024-03-05",
                end_date: None,
                google_event_id: Some("evt-test-1"),
            },
        )
        .await
        .unwrap();

    let response = app
        .oneshot(common::get_request(
            "DELETE",
            &format!("/api/records/{record_id}"),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(stub.deletes.load(Ordering::SeqCst), 1);
    assert!(state.db.get_record(record_id, family_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_record_succeeds_when_calendar_is_down() {
    let (app, state) = common::create_test_app(common::TestEndpoints::default()).await;
    let (user_id, family_id) = common::seed_user(&state.db, "g1", "Anna", Some("refresh-1")).await;
    let token = common::session_token(&state, user_id);

    let record_id = state
        .db
        .create_record(
            user_id,
            family_id,
            &RecordFields {
                member_id: None,
                title: "Rýma",
                description: None,
                start_date: "2024-03-05",
                end_date: None,
                google_event_id: Some("evt-test-1"),
            },
        )
        .await
        .unwrap();

    let response = app
        .oneshot(common::get_request(
            "DELETE",
            &format!("/api/records/{record_id}"),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(state.db.get_record(record_id, family_id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_calendars_with_and_without_consent() {
    let (base, _stub) = common::spawn_calendar_stub().await;
    let (app, state) = common::create_test_app(common::endpoints_with_calendar(&base)).await;

    let (with_token, _) = common::seed_user(&state.db, "g1", "Anna", Some("refresh-1")).await;
    let (without_token, _) = common::seed_user(&state.db, "g2", "Petr", None).await;

    let token = common::session_token(&state, with_token);
    let response = app
        .clone()
        .oneshot(common::get_request("GET", "/api/calendars", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let calendars = common::body_json(response).await;
    assert_eq!(calendars.as_array().unwrap().len(), 2);
    assert_eq!(calendars[0]["id"], "primary");
    assert_eq!(calendars[0]["primary"], true);

    // No refresh token: empty list, not an error
    let token = common::session_token(&state, without_token);
    let response = app
        .oneshot(common::get_request("GET", "/api/calendars", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let calendars = common::body_json(response).await;
    assert!(calendars.as_array().unwrap().is_empty());
}
