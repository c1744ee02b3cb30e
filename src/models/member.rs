// SPDX-License-Identifier: MIT

//! Tracked family members and their per-member health entries.

use serde::Serialize;

/// A tracked person (e.g. a child), not necessarily a login identity.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FamilyMember {
    pub id: i64,
    pub family_id: i64,
    pub name: String,
    /// Color tag used by the frontend
    pub color: String,
    pub created_at: String,
}

/// Vaccination entry, cascade-deleted with its member.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Vaccination {
    pub id: i64,
    pub member_id: i64,
    pub vaccine_name: String,
    pub date_given: String,
    pub next_dose_date: Option<String>,
    pub batch_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

/// Growth measurement entry, cascade-deleted with its member.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GrowthRecord {
    pub id: i64,
    pub member_id: i64,
    pub date: String,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub head_circumference: Option<f64>,
    pub notes: Option<String>,
    pub created_at: String,
}
