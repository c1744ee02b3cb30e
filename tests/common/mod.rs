// SPDX-License-Identifier: MIT

//! Shared test harness: in-memory app instances, stub Google endpoints
//! and seed helpers.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use zdravi_tracker::config::Config;
use zdravi_tracker::db::{Db, NewUser};
use zdravi_tracker::middleware::auth::create_session_token;
use zdravi_tracker::routes::create_router;
use zdravi_tracker::services::{CalendarClient, GoogleAuthService};
use zdravi_tracker::AppState;

/// HS256 key the stubbed Google "signs" ID tokens with.
pub const GOOGLE_TEST_KEY: &[u8] = b"google_test_signing_key_32_bytes";

/// Endpoint that refuses connections, for exercising external failures.
pub const DEAD_ENDPOINT: &str = "http://127.0.0.1:9";

/// External endpoints a test app talks to.
#[allow(dead_code)]
pub struct TestEndpoints {
    pub google_token_url: String,
    pub calendar_api_base: String,
    pub calendar_token_url: String,
}

impl Default for TestEndpoints {
    fn default() -> Self {
        Self {
            google_token_url: format!("{DEAD_ENDPOINT}/token"),
            calendar_api_base: DEAD_ENDPOINT.to_string(),
            calendar_token_url: format!("{DEAD_ENDPOINT}/token"),
        }
    }
}

/// Create a test app over a fresh in-memory database.
///
/// All external endpoints default to a dead port, so any test that does
/// not stand up a stub exercises the failure paths.
#[allow(dead_code)]
pub async fn create_test_app(endpoints: TestEndpoints) -> (Router, Arc<AppState>) {
    let mut config = Config::default();
    config.upload_dir = tempfile::tempdir()
        .expect("Failed to create temp upload dir")
        .keep()
        .to_string_lossy()
        .into_owned();

    let db = Db::in_memory().await.expect("Failed to open test database");

    let google_auth = GoogleAuthService::new_with_static_key(
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
        endpoints.google_token_url,
        DecodingKey::from_secret(GOOGLE_TEST_KEY),
        Algorithm::HS256,
    )
    .expect("Failed to build auth service");

    let calendar = CalendarClient::with_endpoints(
        endpoints.calendar_api_base,
        endpoints.calendar_token_url,
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
    );

    let state = Arc::new(AppState {
        config,
        db,
        google_auth,
        calendar,
    });

    (create_router(state.clone()), state)
}

/// Insert a user with their own family; returns (user_id, family_id).
#[allow(dead_code)]
pub async fn seed_user(db: &Db, google_id: &str, name: &str, refresh_token: Option<&str>) -> (i64, i64) {
    let email = format!("{google_id}@example.com");
    let user_id = db
        .create_user(&NewUser {
            google_id,
            email: Some(&email),
            name: Some(name),
            picture: None,
            refresh_token,
        })
        .await
        .expect("Failed to seed user");

    let family_id = db
        .create_family_for_user(user_id, &format!("Rodina - {name}"))
        .await
        .expect("Failed to seed family");

    (user_id, family_id)
}

/// Signed session token accepted by the test app.
#[allow(dead_code)]
pub fn session_token(state: &AppState, user_id: i64) -> String {
    create_session_token(user_id, &state.config.session_signing_key)
        .expect("Failed to create session token")
}

/// Build an authenticated JSON request.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, token: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Build an authenticated request with no body.
#[allow(dead_code)]
pub fn get_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

/// Read and parse a JSON response body.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    serde_json::from_slice(&bytes).expect("Response body was not JSON")
}

// ─── Stub Google Calendar ────────────────────────────────────

/// Counters recorded by the calendar stub.
#[derive(Default)]
pub struct CalendarStub {
    pub inserts: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
    /// Body of the most recent insert or update
    pub last_event: Mutex<Option<Value>>,
    /// Calendar id targeted by the most recent event call
    pub last_calendar: Mutex<Option<String>>,
}

/// Serve a minimal Google Calendar v3 lookalike on an OS-assigned port.
///
/// Returns the base URL and the shared counters. Events are always
/// created as `evt-test-1`.
#[allow(dead_code)]
pub async fn spawn_calendar_stub() -> (String, Arc<CalendarStub>) {
    let stub = Arc::new(CalendarStub::default());

    async fn token() -> Json<Value> {
        Json(json!({ "access_token": "stub-access-token", "expires_in": 3600 }))
    }

    async fn calendar_list() -> Json<Value> {
        Json(json!({
            "items": [
                { "id": "primary", "summary": "Main", "primary": true },
                { "id": "family@group.calendar.google.com", "summary": "Family" }
            ]
        }))
    }

    async fn insert_event(
        State(stub): State<Arc<CalendarStub>>,
        Path(calendar): Path<String>,
        Json(event): Json<Value>,
    ) -> Json<Value> {
        stub.inserts.fetch_add(1, Ordering::SeqCst);
        *stub.last_event.lock().unwrap() = Some(event);
        *stub.last_calendar.lock().unwrap() = Some(calendar);
        Json(json!({ "id": "evt-test-1" }))
    }

    async fn update_event(
        State(stub): State<Arc<CalendarStub>>,
        Path((calendar, event_id)): Path<(String, String)>,
        Json(event): Json<Value>,
    ) -> Json<Value> {
        stub.updates.fetch_add(1, Ordering::SeqCst);
        *stub.last_event.lock().unwrap() = Some(event);
        *stub.last_calendar.lock().unwrap() = Some(calendar);
        Json(json!({ "id": event_id }))
    }

    async fn delete_event(
        State(stub): State<Arc<CalendarStub>>,
        Path((calendar, _event_id)): Path<(String, String)>,
    ) -> StatusCode {
        stub.deletes.fetch_add(1, Ordering::SeqCst);
        *stub.last_calendar.lock().unwrap() = Some(calendar);
        StatusCode::NO_CONTENT
    }

    let router = Router::new()
        .route("/token", post(token))
        .route("/users/me/calendarList", get(calendar_list))
        .route("/calendars/{calendar}/events", post(insert_event))
        .route("/calendars/{calendar}/events/{event}", put(update_event))
        .route("/calendars/{calendar}/events/{event}", delete(delete_event))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    (format!("http://{addr}"), stub)
}

/// Endpoints wired to a calendar stub (Google login stays dead).
#[allow(dead_code)]
pub fn endpoints_with_calendar(base: &str) -> TestEndpoints {
    TestEndpoints {
        google_token_url: format!("{DEAD_ENDPOINT}/token"),
        calendar_api_base: base.to_string(),
        calendar_token_url: format!("{base}/token"),
    }
}

// ─── Stub Google login ───────────────────────────────────────

/// ID token the stubbed Google mints, verifiable by the test app.
#[allow(dead_code)]
pub fn google_id_token(sub: &str, email: &str, name: &str) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();

    let claims = json!({
        "sub": sub,
        "email": email,
        "name": name,
        "aud": "test_client_id",
        "iss": "https://accounts.google.com",
        "iat": now,
        "exp": now + 3600,
    });

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(GOOGLE_TEST_KEY),
    )
    .expect("Failed to encode stub ID token")
}

/// Serve a token endpoint that answers every code exchange with the
/// given ID token (and optional refresh token).
#[allow(dead_code)]
pub async fn spawn_google_stub(id_token: String, refresh_token: Option<String>) -> String {
    let reply = match refresh_token {
        Some(refresh) => json!({ "id_token": id_token, "refresh_token": refresh }),
        None => json!({ "id_token": id_token }),
    };

    let router = Router::new().route(
        "/token",
        post(move || {
            let reply = reply.clone();
            async move { Json(reply) }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub listener");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    format!("http://{addr}/token")
}
