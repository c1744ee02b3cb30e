// SPDX-License-Identifier: MIT

//! Family-member routes, plus the per-member vaccination and growth
//! sub-resources. Everything is scoped to the caller's family.

use crate::dates::parse_date;
use crate::db::{GrowthFields, VaccinationFields};
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{FamilyMember, GrowthRecord, Vaccination};
use crate::routes::records::{CreatedResponse, MessageResponse};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

/// Default color tag for members created without one.
const DEFAULT_MEMBER_COLOR: &str = "#3b82f6";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/members", get(list_members).post(create_member))
        .route("/api/members/{id}", delete(delete_member))
        .route(
            "/api/members/{id}/vaccinations",
            get(list_vaccinations).post(create_vaccination),
        )
        .route(
            "/api/members/{id}/growth",
            get(list_growth).post(create_growth),
        )
        .route(
            "/api/vaccinations/{id}",
            delete(delete_vaccination).put(update_vaccination),
        )
        .route(
            "/api/growth/{id}",
            delete(delete_growth).put(update_growth),
        )
}

// ─── Members ─────────────────────────────────────────────────

async fn list_members(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<FamilyMember>>> {
    let members = state.db.list_members(user.family_id).await?;
    Ok(Json(members))
}

#[derive(Deserialize)]
struct MemberRequest {
    name: String,
    #[serde(default)]
    color: Option<String>,
}

async fn create_member(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<MemberRequest>,
) -> Result<Json<FamilyMember>> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Member name is required".to_string()));
    }
    let color = req.color.as_deref().unwrap_or(DEFAULT_MEMBER_COLOR);

    let id = state
        .db
        .create_member(user.family_id, user.user_id, name, color)
        .await?;
    let member = state
        .db
        .get_member(id, user.family_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member {id} not found")))?;

    Ok(Json(member))
}

/// Cascades to the member's vaccinations and growth entries; records that
/// reference the member keep the dangling `member_id`.
async fn delete_member(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(member_id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    let deleted = state.db.delete_member(member_id, user.family_id).await?;
    if !deleted {
        return Err(AppError::NotFound(format!("Member {member_id} not found")));
    }
    Ok(Json(MessageResponse {
        message: "Deleted".to_string(),
    }))
}

// ─── Vaccinations ────────────────────────────────────────────

async fn list_vaccinations(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(member_id): Path<i64>,
) -> Result<Json<Vec<Vaccination>>> {
    require_member(&state, member_id, user.family_id).await?;
    let vaccinations = state.db.list_vaccinations(member_id).await?;
    Ok(Json(vaccinations))
}

#[derive(Deserialize)]
struct VaccinationRequest {
    vaccine_name: String,
    date_given: String,
    #[serde(default)]
    next_dose_date: Option<String>,
    #[serde(default)]
    batch_number: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

impl VaccinationRequest {
    fn validate(&self) -> Result<VaccinationFields<'_>> {
        parse_date(&self.date_given)?;
        if let Some(next) = &self.next_dose_date {
            parse_date(next)?;
        }
        Ok(VaccinationFields {
            vaccine_name: &self.vaccine_name,
            date_given: &self.date_given,
            next_dose_date: self.next_dose_date.as_deref(),
            batch_number: self.batch_number.as_deref(),
            notes: self.notes.as_deref(),
        })
    }
}

async fn create_vaccination(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(member_id): Path<i64>,
    Json(req): Json<VaccinationRequest>,
) -> Result<Json<CreatedResponse>> {
    require_member(&state, member_id, user.family_id).await?;
    let fields = req.validate()?;
    let id = state.db.create_vaccination(member_id, &fields).await?;
    Ok(Json(CreatedResponse { id }))
}

async fn update_vaccination(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(vaccination_id): Path<i64>,
    Json(req): Json<VaccinationRequest>,
) -> Result<Json<MessageResponse>> {
    let fields = req.validate()?;
    let updated = state
        .db
        .update_vaccination(vaccination_id, user.family_id, &fields)
        .await?;
    if !updated {
        return Err(AppError::NotFound(format!(
            "Vaccination {vaccination_id} not found"
        )));
    }
    Ok(Json(MessageResponse {
        message: "Updated".to_string(),
    }))
}

async fn delete_vaccination(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(vaccination_id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    let deleted = state
        .db
        .delete_vaccination(vaccination_id, user.family_id)
        .await?;
    if !deleted {
        return Err(AppError::NotFound(format!(
            "Vaccination {vaccination_id} not found"
        )));
    }
    Ok(Json(MessageResponse {
        message: "Deleted".to_string(),
    }))
}

// ─── Growth records ──────────────────────────────────────────

async fn list_growth(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(member_id): Path<i64>,
) -> Result<Json<Vec<GrowthRecord>>> {
    require_member(&state, member_id, user.family_id).await?;
    let entries = state.db.list_growth_records(member_id).await?;
    Ok(Json(entries))
}

#[derive(Deserialize)]
struct GrowthRequest {
    date: String,
    #[serde(default)]
    height: Option<f64>,
    #[serde(default)]
    weight: Option<f64>,
    #[serde(default)]
    head_circumference: Option<f64>,
    #[serde(default)]
    notes: Option<String>,
}

impl GrowthRequest {
    fn validate(&self) -> Result<GrowthFields<'_>> {
        parse_date(&self.date)?;
        if self.height.is_none() && self.weight.is_none() && self.head_circumference.is_none() {
            return Err(AppError::BadRequest(
                "At least one measurement is required".to_string(),
            ));
        }
        Ok(GrowthFields {
            date: &self.date,
            height: self.height,
            weight: self.weight,
            head_circumference: self.head_circumference,
            notes: self.notes.as_deref(),
        })
    }
}

async fn create_growth(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(member_id): Path<i64>,
    Json(req): Json<GrowthRequest>,
) -> Result<Json<CreatedResponse>> {
    require_member(&state, member_id, user.family_id).await?;
    let fields = req.validate()?;
    let id = state.db.create_growth_record(member_id, &fields).await?;
    Ok(Json(CreatedResponse { id }))
}

async fn update_growth(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(growth_id): Path<i64>,
    Json(req): Json<GrowthRequest>,
) -> Result<Json<MessageResponse>> {
    let fields = req.validate()?;
    let updated = state
        .db
        .update_growth_record(growth_id, user.family_id, &fields)
        .await?;
    if !updated {
        return Err(AppError::NotFound(format!(
            "Growth entry {growth_id} not found"
        )));
    }
    Ok(Json(MessageResponse {
        message: "Updated".to_string(),
    }))
}

async fn delete_growth(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(growth_id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    let deleted = state
        .db
        .delete_growth_record(growth_id, user.family_id)
        .await?;
    if !deleted {
        return Err(AppError::NotFound(format!(
            "Growth entry {growth_id} not found"
        )));
    }
    Ok(Json(MessageResponse {
        message: "Deleted".to_string(),
    }))
}

/// 404 unless the member exists within the caller's family.
async fn require_member(state: &AppState, member_id: i64, family_id: i64) -> Result<FamilyMember> {
    state
        .db
        .get_member(member_id, family_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member {member_id} not found")))
}
