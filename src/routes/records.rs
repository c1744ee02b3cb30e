// SPDX-License-Identifier: MIT

//! Health-record routes: records CRUD plus their treatments and attachments.
//!
//! Record create/update/delete invoke calendar reconciliation inline; the
//! local write is the source of truth and never fails because of Google.

use crate::dates::parse_date;
use crate::db::RecordFields;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{Attachment, Record, RecordWithMember, Treatment};
use crate::services::sync::{self, RecordEvent};
use crate::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    routing::{get, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/records", get(list_records).post(create_record))
        .route(
            "/api/records/{id}",
            put(update_record).delete(delete_record),
        )
        .route(
            "/api/records/{id}/treatments",
            get(list_treatments).post(create_treatment),
        )
        .route(
            "/api/records/{id}/attachments",
            get(list_attachments).post(upload_attachment),
        )
}

// ─── Records ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct RecordsQuery {
    member_id: Option<i64>,
}

/// List the family's records, newest first, with member name/color.
async fn list_records(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<RecordsQuery>,
) -> Result<Json<Vec<RecordWithMember>>> {
    let records = state
        .db
        .list_records(user.family_id, params.member_id)
        .await?;
    Ok(Json(records))
}

#[derive(Deserialize)]
pub struct RecordRequest {
    title: String,
    #[serde(default)]
    description: Option<String>,
    start_date: String,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    member_id: Option<i64>,
    /// Whether the record should be mirrored as a calendar event
    #[serde(default, rename = "addToCalendar")]
    add_to_calendar: bool,
    /// Per-request target calendar override
    #[serde(default, rename = "calendarId")]
    calendar_id: Option<String>,
}

impl RecordRequest {
    /// Validate the date range and resolve the member (both family-scoped).
    async fn validate(
        &self,
        state: &AppState,
        family_id: i64,
    ) -> Result<Option<String>> {
        let start = parse_date(&self.start_date)?;
        if let Some(end_date) = &self.end_date {
            let end = parse_date(end_date)?;
            if end < start {
                return Err(AppError::BadRequest(
                    "end_date must not be before start_date".to_string(),
                ));
            }
        }

        match self.member_id {
            None => Ok(None),
            Some(member_id) => {
                let member = state
                    .db
                    .get_member(member_id, family_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::BadRequest(format!("Unknown family member {member_id}"))
                    })?;
                Ok(Some(member.name))
            }
        }
    }
}

#[derive(Serialize)]
pub struct RecordCreated {
    pub id: i64,
    pub google_event_id: Option<String>,
}

/// Create a record, reconciling the calendar mirror first.
async fn create_record(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<RecordRequest>,
) -> Result<Json<RecordCreated>> {
    let member_name = req.validate(&state, user.family_id).await?;

    let google_event_id = sync::reconcile(
        &state.db,
        &state.calendar,
        user.user_id,
        req.add_to_calendar,
        req.calendar_id.as_deref(),
        None,
        &RecordEvent {
            title: &req.title,
            description: req.description.as_deref(),
            start_date: &req.start_date,
            end_date: req.end_date.as_deref(),
            member_name: member_name.as_deref(),
        },
    )
    .await;

    let id = state
        .db
        .create_record(
            user.user_id,
            user.family_id,
            &RecordFields {
                member_id: req.member_id,
                title: &req.title,
                description: req.description.as_deref(),
                start_date: &req.start_date,
                end_date: req.end_date.as_deref(),
                google_event_id: google_event_id.as_deref(),
            },
        )
        .await?;

    Ok(Json(RecordCreated {
        id,
        google_event_id,
    }))
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Update a record (full-field replacement), reconciling the mirror.
async fn update_record(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(record_id): Path<i64>,
    Json(req): Json<RecordRequest>,
) -> Result<Json<MessageResponse>> {
    let existing: Record = state
        .db
        .get_record(record_id, user.family_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Record {record_id} not found")))?;

    let member_name = req.validate(&state, user.family_id).await?;

    let google_event_id = sync::reconcile(
        &state.db,
        &state.calendar,
        user.user_id,
        req.add_to_calendar,
        req.calendar_id.as_deref(),
        existing.google_event_id.as_deref(),
        &RecordEvent {
            title: &req.title,
            description: req.description.as_deref(),
            start_date: &req.start_date,
            end_date: req.end_date.as_deref(),
            member_name: member_name.as_deref(),
        },
    )
    .await;

    let updated = state
        .db
        .update_record(
            record_id,
            user.family_id,
            &RecordFields {
                member_id: req.member_id,
                title: &req.title,
                description: req.description.as_deref(),
                start_date: &req.start_date,
                end_date: req.end_date.as_deref(),
                google_event_id: google_event_id.as_deref(),
            },
        )
        .await?;

    if !updated {
        return Err(AppError::NotFound(format!("Record {record_id} not found")));
    }

    Ok(Json(MessageResponse {
        message: "Updated".to_string(),
    }))
}

/// Delete a record (cascades treatments and attachments), deleting the
/// mirrored event best-effort first.
async fn delete_record(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(record_id): Path<i64>,
) -> Result<Json<MessageResponse>> {
    let record = state
        .db
        .get_record(record_id, user.family_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Record {record_id} not found")))?;

    if let Some(event_id) = &record.google_event_id {
        if let Err(e) =
            sync::delete_mirror(&state.db, &state.calendar, user.user_id, None, event_id).await
        {
            tracing::warn!(record_id, event_id = %event_id, error = %e, "Calendar event delete failed");
        }
    }

    state.db.delete_record(record_id, user.family_id).await?;

    Ok(Json(MessageResponse {
        message: "Deleted".to_string(),
    }))
}

// ─── Treatments ──────────────────────────────────────────────

/// List treatments; the record must belong to the caller's family.
async fn list_treatments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(record_id): Path<i64>,
) -> Result<Json<Vec<Treatment>>> {
    require_record(&state, record_id, user.family_id).await?;
    let treatments = state.db.list_treatments(record_id).await?;
    Ok(Json(treatments))
}

#[derive(Deserialize)]
pub struct TreatmentRequest {
    name: String,
    #[serde(default, rename = "type")]
    treatment_type: Option<String>,
    #[serde(default)]
    dosage: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

#[derive(Serialize)]
pub struct CreatedResponse {
    pub id: i64,
}

/// Add a treatment; the record must belong to the caller's family.
async fn create_treatment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(record_id): Path<i64>,
    Json(req): Json<TreatmentRequest>,
) -> Result<Json<CreatedResponse>> {
    require_record(&state, record_id, user.family_id).await?;

    let id = state
        .db
        .create_treatment(
            record_id,
            &req.name,
            req.treatment_type.as_deref(),
            req.dosage.as_deref(),
            req.notes.as_deref(),
        )
        .await?;

    Ok(Json(CreatedResponse { id }))
}

// ─── Attachments ─────────────────────────────────────────────

/// Attachment with its public URL under `/uploads`.
#[derive(Serialize)]
pub struct AttachmentResponse {
    #[serde(flatten)]
    pub attachment: Attachment,
    pub url: String,
}

/// List a record's attachments with public URLs.
async fn list_attachments(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(record_id): Path<i64>,
) -> Result<Json<Vec<AttachmentResponse>>> {
    require_record(&state, record_id, user.family_id).await?;

    let attachments = state.db.list_attachments(record_id).await?;
    let mapped = attachments
        .into_iter()
        .map(|a| AttachmentResponse {
            url: format!("/uploads/{}", a.path),
            attachment: a,
        })
        .collect();

    Ok(Json(mapped))
}

/// Upload an attachment (multipart `file` field).
///
/// Ownership is checked before anything touches disk, so a rejected
/// upload leaves no orphan file behind.
async fn upload_attachment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(record_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<Json<AttachmentResponse>> {
    require_record(&state, record_id, user.family_id).await?;

    let mut filename: Option<String> = None;
    let mut mime_type: Option<String> = None;
    let mut data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart error: {e}")))?
    {
        if field.name() == Some("file") {
            filename = field.file_name().map(|n| n.to_string());
            mime_type = field.content_type().map(|c| c.to_string());
            data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Read error: {e}")))?
                    .to_vec(),
            );
        }
        // ignore unknown fields
    }

    let filename =
        filename.ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;
    let data = data.ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;

    // Timestamp prefix avoids collisions between same-named uploads
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {e}")))?
        .as_millis();
    let stored_name = format!("{}-{}", millis, sanitize_filename(&filename));
    let stored_path = std::path::Path::new(&state.config.upload_dir).join(&stored_name);

    tokio::fs::write(&stored_path, &data)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to store upload: {e}")))?;

    let id = state
        .db
        .create_attachment(record_id, &filename, &stored_name, mime_type.as_deref())
        .await;

    let id = match id {
        Ok(id) => id,
        Err(e) => {
            // Do not leave an orphan file when the row insert fails
            if let Err(rm) = tokio::fs::remove_file(&stored_path).await {
                tracing::warn!(path = %stored_path.display(), error = %rm, "Failed to remove orphan upload");
            }
            return Err(e);
        }
    };

    let attachment = state
        .db
        .get_attachment(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Attachment {id} not found")))?;

    Ok(Json(AttachmentResponse {
        url: format!("/uploads/{stored_name}"),
        attachment,
    }))
}

/// Strip path separators so an uploaded name cannot escape the upload dir.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect()
}

/// 404 unless the record exists within the caller's family.
async fn require_record(state: &AppState, record_id: i64, family_id: i64) -> Result<Record> {
    state
        .db
        .get_record(record_id, family_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Record {record_id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("zprava.pdf"), "zprava.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
    }
}
