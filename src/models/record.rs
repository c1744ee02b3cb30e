// SPDX-License-Identifier: MIT

//! Health record models (records, treatments, attachments).

use serde::Serialize;

/// A logged health event (illness, injury) with an inclusive date range.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Record {
    pub id: i64,
    /// Creator
    pub user_id: i64,
    /// Ownership scope
    pub family_id: i64,
    pub member_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub start_date: String,
    /// Inclusive; None means a single-day record
    pub end_date: Option<String>,
    /// Id of the mirrored Google Calendar event, if any
    pub google_event_id: Option<String>,
    pub created_at: String,
}

/// Record joined with its member's name and color for list views.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecordWithMember {
    pub id: i64,
    pub user_id: i64,
    pub family_id: i64,
    pub member_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub start_date: String,
    pub end_date: Option<String>,
    pub google_event_id: Option<String>,
    pub created_at: String,
    pub member_name: Option<String>,
    pub member_color: Option<String>,
}

/// Treatment attached to a record, cascade-deleted with it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Treatment {
    pub id: i64,
    pub record_id: i64,
    pub name: String,
    /// 'medication', 'therapy', 'lifestyle', or free text
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub treatment_type: Option<String>,
    pub dosage: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

/// Uploaded file attached to a record, cascade-deleted with it.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Attachment {
    pub id: i64,
    pub record_id: i64,
    /// Original filename as uploaded
    pub filename: String,
    /// Stored filename under the upload directory (timestamp-prefixed)
    pub path: String,
    pub mime_type: Option<String>,
    pub created_at: String,
}
