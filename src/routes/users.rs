// SPDX-License-Identifier: MIT

//! Profile, settings and calendar-listing routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::UserProfile;
use crate::services::CalendarSummary;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/settings", put(update_settings))
        .route("/api/calendars", get(list_calendars))
}

/// Get the current user's profile, including calendar preferences.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserProfile>> {
    let profile = state
        .db
        .get_user(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    Ok(Json(profile.into()))
}

#[derive(Deserialize)]
pub struct SettingsRequest {
    #[serde(default)]
    calendar_id: Option<String>,
    #[serde(default)]
    sync_enabled: Option<bool>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Partial update of the caller's calendar preferences.
async fn update_settings(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<SettingsRequest>,
) -> Result<Json<MessageResponse>> {
    state
        .db
        .update_settings(user.user_id, req.calendar_id.as_deref(), req.sync_enabled)
        .await?;

    Ok(Json(MessageResponse {
        message: "Settings updated".to_string(),
    }))
}

/// List the caller's writable Google calendars.
///
/// A user who never granted calendar access simply gets an empty list.
async fn list_calendars(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<CalendarSummary>>> {
    let profile = state
        .db
        .get_user(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user.user_id)))?;

    let Some(refresh_token) = profile.refresh_token else {
        return Ok(Json(vec![]));
    };

    let access_token = state.calendar.access_token(&refresh_token).await?;
    let calendars = state.calendar.list_calendars(&access_token).await?;

    Ok(Json(calendars))
}
