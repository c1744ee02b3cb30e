// SPDX-License-Identifier: MIT

//! Google OAuth login and logout.

use crate::db::NewUser;
use crate::error::{AppError, Result};
use crate::middleware::auth::{create_session_token, SESSION_COOKIE, SESSION_TTL_SECS};
use crate::models::UserProfile;
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    /// Authorization code from the Google login popup
    code: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user: UserProfile,
}

/// Exchange the authorization code, upsert the user and open a session.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    let exchange = state
        .google_auth
        .exchange_code(&req.code)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Authorization code exchange failed");
            AppError::Unauthorized
        })?;

    let identity = &exchange.identity;

    let user_id = match state.db.find_user_by_google_id(&identity.subject).await? {
        Some(user) => {
            // Google does not reissue the refresh token on every login
            if let Some(refresh_token) = &exchange.refresh_token {
                state.db.update_refresh_token(user.id, refresh_token).await?;
            }
            user.id
        }
        None => {
            let user_id = state
                .db
                .create_user(&NewUser {
                    google_id: &identity.subject,
                    email: identity.email.as_deref(),
                    name: identity.name.as_deref(),
                    picture: identity.picture.as_deref(),
                    refresh_token: exchange.refresh_token.as_deref(),
                })
                .await?;

            // Every user belongs to exactly one family from the start
            let display = identity.name.as_deref().unwrap_or("nová rodina");
            let family_id = state
                .db
                .create_family_for_user(user_id, &format!("Rodina - {display}"))
                .await?;

            tracing::info!(user_id, family_id, "Created user and family at first login");
            user_id
        }
    };

    let user = state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;

    let token = create_session_token(user_id, &state.config.session_signing_key)?;
    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(SESSION_TTL_SECS as i64))
        .build();

    tracing::info!(user_id, "Login successful");

    Ok((
        jar.add(cookie),
        Json(LoginResponse { user: user.into() }),
    ))
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// Invalidate the session by clearing the cookie.
async fn logout(jar: CookieJar) -> (CookieJar, Json<LogoutResponse>) {
    let mut cookie = Cookie::from(SESSION_COOKIE);
    cookie.set_path("/");

    (
        jar.remove(cookie),
        Json(LogoutResponse {
            message: "Logged out".to_string(),
        }),
    )
}
