// SPDX-License-Identifier: MIT

//! Family routes: overview, rename, and email invites.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Family, FamilyInvite, FamilyUser};
use crate::routes::records::MessageResponse;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/family", get(get_family).put(rename_family))
        .route("/api/family/invite", post(create_invite))
}

#[derive(Serialize)]
struct FamilyOverview {
    family: Family,
    users: Vec<FamilyUser>,
    invites: Vec<FamilyInvite>,
}

/// The caller's family with its login users and pending invites.
async fn get_family(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<FamilyOverview>> {
    let family = state
        .db
        .get_family(user.family_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Family not found".to_string()))?;
    let users = state.db.list_family_users(user.family_id).await?;
    let invites = state.db.list_invites(user.family_id).await?;

    Ok(Json(FamilyOverview {
        family,
        users,
        invites,
    }))
}

#[derive(Deserialize)]
struct RenameRequest {
    name: String,
}

async fn rename_family(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<RenameRequest>,
) -> Result<Json<MessageResponse>> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Family name is required".to_string()));
    }

    state.db.rename_family(user.family_id, name).await?;
    Ok(Json(MessageResponse {
        message: "Updated".to_string(),
    }))
}

#[derive(Deserialize)]
struct InviteRequest {
    email: String,
}

#[derive(Serialize)]
struct InviteResponse {
    id: i64,
    token: String,
}

/// Create an invite token for an email address. Admin only.
async fn create_invite(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<InviteRequest>,
) -> Result<Json<InviteResponse>> {
    let role = state
        .db
        .user_role_in_family(user.family_id, user.user_id)
        .await?;
    if role.as_deref() != Some("admin") {
        return Err(AppError::Unauthorized);
    }

    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("A valid email is required".to_string()));
    }

    // A known user already belongs to a family; every user has exactly one
    if let Some(existing) = state.db.find_user_by_email(&email).await? {
        if state.db.family_id_for_user(existing.id).await?.is_some() {
            return Err(AppError::BadRequest(
                "User already belongs to a family".to_string(),
            ));
        }
    }

    let token = uuid::Uuid::new_v4().to_string();
    let id = state
        .db
        .create_invite(user.family_id, &email, &token, user.user_id)
        .await?;

    tracing::info!(family_id = user.family_id, email = %email, "Family invite created");
    Ok(Json(InviteResponse { id, token }))
}
